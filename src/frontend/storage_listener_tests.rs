use std::sync::Arc;

use crate::frontend::context::NamingContext;
use crate::frontend::storage_listener::handle_join;
use crate::logging::init_for_tests;
use crate::namespace::codec;
use crate::namespace::PathTree;
use crate::shared::wire::frames::{self, JoinRecord};
use crate::shared::wire::types::Status;

fn announced_subtree() -> Vec<u8> {
    let mut tree = PathTree::new();
    tree.add_path("share", false, 7000, "bucket-7000").expect("path should register");
    tree.add_path("share/notes.txt", true, 7000, "bucket-7000")
        .expect("path should register");
    codec::encode(&tree).expect("subtree should encode")
}

#[tokio::test]
async fn join_registers_the_server_and_grafts_its_subtree() {
    init_for_tests();
    let ctx = Arc::new(NamingContext::new(16));

    let (mut client, mut server) = tokio::io::duplex(1 << 20);
    let record = JoinRecord {
        client_port: 7001,
        nm_port: 7000,
        alive_port: 7002,
        uuid: "bucket-7000".to_string(),
        tree: announced_subtree(),
    };
    record.write_to(&mut client).await.expect("record should send");

    handle_join(Arc::clone(&ctx), &mut server)
        .await
        .expect("join should be admitted");

    let status = frames::read_status(&mut client).await.expect("ack should arrive");
    assert_eq!(status, Status::Success);

    let registered = ctx.registry.get(7000).expect("server should be registered");
    assert_eq!(registered.client_port, 7001);
    assert_eq!(registered.alive_port, 7002);
    assert_eq!(registered.uuid, "bucket-7000");
    assert_eq!(registered.tree_bytes, announced_subtree().len());

    assert_eq!(ctx.resolve_owner("share"), Some(7000));
    assert_eq!(ctx.resolve_owner("share/notes.txt"), Some(7000));
}

#[tokio::test]
async fn join_with_a_garbage_subtree_registers_nothing() {
    init_for_tests();
    let ctx = Arc::new(NamingContext::new(16));

    let (mut client, mut server) = tokio::io::duplex(1 << 20);
    let record = JoinRecord {
        client_port: 7001,
        nm_port: 7000,
        alive_port: 7002,
        uuid: "bucket-7000".to_string(),
        tree: vec![0x42, 0x01, 0x02],
    };
    record.write_to(&mut client).await.expect("record should send");

    let err = handle_join(Arc::clone(&ctx), &mut server)
        .await
        .expect_err("garbage subtree should be refused");
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

    assert!(ctx.registry.is_empty());
    assert!(ctx.tree.lock().is_empty());
}

#[tokio::test]
async fn join_with_an_oversized_subtree_registers_nothing() {
    init_for_tests();
    let ctx = Arc::new(NamingContext::new(16));

    let (mut client, mut server) = tokio::io::duplex(1 << 20);
    let record = JoinRecord {
        client_port: 7001,
        nm_port: 7000,
        alive_port: 7002,
        uuid: "bucket-7000".to_string(),
        // Far past the configured namespace.max_tree_bytes ceiling.
        tree: vec![0u8; 128 * 1024],
    };
    record.write_to(&mut client).await.expect("record should send");

    let err = handle_join(Arc::clone(&ctx), &mut server)
        .await
        .expect_err("oversized subtree should be refused");
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    assert!(ctx.registry.is_empty());
}

#[tokio::test]
async fn join_with_a_blank_identity_registers_nothing() {
    init_for_tests();
    let ctx = Arc::new(NamingContext::new(16));

    let (mut client, mut server) = tokio::io::duplex(1 << 20);
    let record = JoinRecord {
        client_port: 7001,
        nm_port: 7000,
        alive_port: 7002,
        uuid: String::new(),
        tree: announced_subtree(),
    };
    record.write_to(&mut client).await.expect("record should send");

    let err = handle_join(Arc::clone(&ctx), &mut server)
        .await
        .expect_err("a join without an identity should be refused");
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    assert!(ctx.registry.is_empty());
}

#[tokio::test]
async fn join_with_an_out_of_range_port_registers_nothing() {
    init_for_tests();
    let ctx = Arc::new(NamingContext::new(16));

    let (mut client, mut server) = tokio::io::duplex(1 << 20);
    let record = JoinRecord {
        client_port: 7001,
        nm_port: 100_000,
        alive_port: 7002,
        uuid: "bucket-a".to_string(),
        tree: announced_subtree(),
    };
    record.write_to(&mut client).await.expect("record should send");

    let err = handle_join(Arc::clone(&ctx), &mut server)
        .await
        .expect_err("an unusable port should be refused");
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    assert!(ctx.registry.is_empty());
}
