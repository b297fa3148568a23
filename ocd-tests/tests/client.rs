use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use ocd_client::Client;
use ocd_server::simulator::TargetSimulator;
use ocd_tests::Served;

#[tokio::test]
async fn replies_follow_command_order() {
    let served = Served::start(TargetSimulator::default());
    let client = Client::connect(served.port).await.unwrap();

    let replies = client
        .send_all([
            "tcl_notifications on",
            "capture \"arm semihosting enable\"",
            "flash banks",
        ])
        .await
        .unwrap();
    assert_eq!(
        replies,
        ["", "semihosting is enabled", "invalid command name \"flash\""]
    );

    client.disconnect().await;
    served.finish();
}

#[tokio::test]
async fn pipelined_commands() {
    let served = Served::start(TargetSimulator::new(0x100, "10.0.0.1"));
    let client = Client::connect(served.port).await.unwrap();

    let write = client.send("mwb 0x10 0x2a").unwrap();
    let read = client.send("mdb 0x10").unwrap();
    let unknown = client.send("cmd1").unwrap();
    assert_eq!(unknown.await.unwrap(), "invalid command name \"cmd1\"");
    assert_eq!(read.await.unwrap(), "0x00000010: 2a ");
    assert_eq!(write.await.unwrap(), "");

    client.disconnect().await;
    let target = served.finish();
    assert_eq!(target.read_byte(0x10), 0x2a);
}

#[tokio::test]
async fn target_events_reach_handlers_under_their_name() {
    let served = Served::start(TargetSimulator::default());
    let client = Client::connect(served.port).await.unwrap();

    let halted = Arc::new(AtomicUsize::new(0));
    let counter = halted.clone();
    client
        .on("halted", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let mut resumed = client.subscribe("resumed").unwrap();

    client
        .send_all(["tcl_notifications on", "reset halt", "resume", "halt"])
        .await
        .unwrap();

    assert_eq!(halted.load(Ordering::SeqCst), 2);
    let payload = resumed.try_recv().unwrap();
    assert!(payload.is_empty());
    assert!(resumed.try_recv().is_err());
    assert_eq!(client.state().await.unwrap().as_deref(), Some("halted"));

    client.disconnect().await;
    served.finish();
}

#[tokio::test]
async fn waiters_fire_once_per_registration() {
    let served = Served::start(TargetSimulator::default());
    let client = Client::connect(served.port).await.unwrap();
    client.send("tcl_notifications on").unwrap().await.unwrap();

    let fired = Arc::new(Mutex::new(Vec::new()));
    for name in ["first", "second"] {
        let fired = fired.clone();
        client
            .when("running", move || fired.lock().unwrap().push(name))
            .unwrap();
    }

    client.send("reset run").unwrap().await.unwrap();
    client.send("halt").unwrap().await.unwrap();
    client.send("resume").unwrap().await.unwrap();

    let mut fired = fired.lock().unwrap().clone();
    fired.sort();
    assert_eq!(fired, ["first", "second"]);

    // Already running, so this resolves right away.
    client.wait_for("running").await.unwrap();

    client.disconnect().await;
    served.finish();
}
