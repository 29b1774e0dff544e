//! Example: Reading data from PLC memory
//!
//! Run with: cargo run --example simple_read
//!
//! This example demonstrates:
//! - Connecting by rack/slot
//! - Reading data blocks, flags, counters and timers
//! - Decoding typed values with the utility functions
//! - Reading several variables in one request

use s7_client::utils::{format_hex, get_bit_at, get_dint_at, get_real_at, get_string_at};
use s7_client::{Area, Client, ClientConfig, MultiVar, S7Tag, WordLength};
use std::time::Duration;

fn main() -> s7_client::Result<()> {
    // =========================================================================
    // Connect to PLC
    // =========================================================================

    let config = ClientConfig::new("192.168.0.10", 0, 2)
        .with_timeout(Duration::from_secs(3))
        .with_name("line1");
    let mut client = Client::new(config);
    client.connect()?;
    println!(
        "Connected to {} (PDU {} of {} requested)",
        client,
        client.pdu_negotiated(),
        client.pdu_requested()
    );

    // =========================================================================
    // Data Blocks
    // =========================================================================

    println!("\n=== DB1 ===\n");

    let mut db = [0u8; 64];
    client.db_read(1, 0, &mut db)?;
    println!("Raw: {}", format_hex(&db[..16]));
    println!("DB1.DBD0  (REAL) = {:.2}", get_real_at(&db, 0)?);
    println!("DB1.DBD4  (DINT) = {}", get_dint_at(&db, 4)?);
    println!("DB1.DBX8.0       = {}", get_bit_at(&db, 8, 0)?);
    println!("DB1.DBB10 (STRING) = \"{}\"", get_string_at(&db, 10)?);

    // Large transfers are split into PDU-sized requests automatically
    let mut big = vec![0u8; 2048];
    let read = client.read_area(Area::DB, 2, 0, big.len(), WordLength::Byte, &mut big)?;
    println!("\nDB2: {} bytes in {:?}", read, client.exec_time());

    // =========================================================================
    // Flags, Counters and Timers
    // =========================================================================

    println!("\n=== Flags, counters, timers ===\n");

    let mut flags = [0u8; 4];
    client.mb_read(100, &mut flags)?;
    println!("MB100..MB103 = {}", format_hex(&flags));

    let mut counters = [0u16; 4];
    client.ct_read(0, &mut counters)?;
    println!("C0..C3 = {:?}", counters);

    let mut timers = [0u16; 2];
    client.tm_read(5, &mut timers)?;
    println!("T5..T6 = {:04X?}", timers);

    // =========================================================================
    // Multiple Read (Single Request)
    // =========================================================================

    println!("\n=== Multiple Read ===\n");

    let mut level = [0u8; 4];
    let mut inputs = [0u8; 2];
    let mut counter = [0u8; 2];
    let mut batch = MultiVar::new(&mut client);
    batch.add(S7Tag::new(Area::DB, 1, 0, 1, WordLength::Real), &mut level)?;
    batch.add(S7Tag::new(Area::PE, 0, 0, 2, WordLength::Byte), &mut inputs)?;
    batch.add(S7Tag::new(Area::CT, 0, 3, 1, WordLength::Counter), &mut counter)?;
    let results = batch.read()?;

    for (n, result) in results.iter().enumerate() {
        match result {
            Ok(()) => println!("item {n}: ok"),
            Err(e) => println!("item {n}: {e}"),
        }
    }
    println!("DB1.DBD0 = {:.2}", get_real_at(&level, 0)?);
    println!("IB0..IB1 = {}", format_hex(&inputs));

    client.disconnect();
    println!("\nRead example completed!");
    Ok(())
}
