use boiler_core::telemetry::status_report;
use boiler_core::{Machine, MachineConfig, SimulatedRig, StatusPublisher};
use silvia_ctl::bridge::BridgeServer;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

fn test_machine() -> Machine {
    let rig = SimulatedRig::new(70.0);
    Machine::new(
        &MachineConfig::default(),
        rig.sensor(),
        rig.buttons(),
        rig.relays(),
    )
}

fn server() -> (BridgeServer, String) {
    let server = BridgeServer::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = server.local_addr().expect("local addr").to_string();
    (server, addr)
}

#[test]
fn status_reports_reach_connected_clients() {
    let (mut server, addr) = server();
    let stream = TcpStream::connect(&addr).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut reader = BufReader::new(stream);

    let mut machine = test_machine();
    machine.state.record_temperature(92.1, 4_000);
    machine.state.power_ms = 250;
    let report = status_report(&machine, 5_000);

    let mut delivered = false;
    for _ in 0..100 {
        server.poll();
        if server.publish(&report) {
            delivered = true;
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert!(delivered, "no client accepted within timeout");

    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["ts_ms"], 5_000);
    assert_eq!(value["data"]["temperature"], 92.1);
    assert_eq!(value["data"]["power_ms"], 250);
    assert_eq!(value["relays"]["boiler"], false);
}

#[test]
fn config_updates_are_drained_from_clients() {
    let (mut server, addr) = server();
    let mut stream = TcpStream::connect(&addr).expect("connect");

    // Malformed and irrelevant lines are skipped; the valid update lands.
    writeln!(stream, r#"{{"config_update": {{"pid_p": "hot"}}}}"#).unwrap();
    writeln!(stream, r#"{{"something_else": 1}}"#).unwrap();
    writeln!(
        stream,
        r#"{{"config_update": {{"brew_setpoint": 94.5, "pid_d": 6.0, "bogus_key": true}}}}"#
    )
    .unwrap();
    stream.flush().unwrap();

    let mut updates = Vec::new();
    for _ in 0..100 {
        updates.extend(server.poll());
        if !updates.is_empty() {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].brew_setpoint, Some(94.5));
    assert_eq!(updates[0].pid_d, Some(6.0));
    assert!(updates[0].pid_p.is_none());
}

#[test]
fn endless_line_gets_the_client_dropped() {
    let (mut server, addr) = server();
    let mut stream = TcpStream::connect(&addr).expect("connect");
    let machine = test_machine();
    let report = status_report(&machine, 1_000);

    // Make sure the client is accepted before misbehaving.
    let mut connected = false;
    for _ in 0..100 {
        server.poll();
        if server.publish(&report) {
            connected = true;
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert!(connected, "client never accepted");

    // Stream well past the line cap without ever sending a newline.
    let junk = vec![b'a'; 16 * 1024];
    stream.write_all(&junk).unwrap();
    stream.flush().unwrap();
    let mut delivered = true;
    for _ in 0..100 {
        server.poll();
        delivered = server.publish(&report);
        if !delivered {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert!(!delivered, "unbounded line did not get the client dropped");
}

#[test]
fn disconnected_clients_are_dropped() {
    let (mut server, addr) = server();
    let stream = TcpStream::connect(&addr).expect("connect");

    // Let the server accept, then hang up.
    thread::sleep(Duration::from_millis(20));
    server.poll();
    drop(stream);

    let machine = test_machine();
    let report = status_report(&machine, 1_000);
    let mut delivered = true;
    for _ in 0..100 {
        server.poll();
        delivered = server.publish(&report);
        if !delivered {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert!(!delivered, "dropped client still considered connected");
}
