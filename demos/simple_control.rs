//! Example: PLC information and control operations
//!
//! Run with: cargo run --example simple_control
//!
//! This example demonstrates:
//! - Connecting with explicit TSAPs
//! - Reading order code, CPU info and protection level
//! - Reading and setting the PLC clock
//! - Run/stop control and error handling patterns

use s7_client::{
    BlockType, Client, ClientConfig, ConnectionType, CpuStatus, S7Error, Tsap, PARAM_PDU_REQUEST,
};

fn main() -> s7_client::Result<()> {
    // =========================================================================
    // Configuration
    // =========================================================================
    //
    // Rack/slot addressing covers S7-300/400/1200/1500. LOGO! and some
    // S7-200 CPUs need explicit TSAPs instead.

    let config = ClientConfig::new("192.168.0.10", 0, 1)
        .with_connection_type(ConnectionType::Op)
        .with_pdu_size(960);
    println!("Config: {:?}", config);

    let logo = ClientConfig::new("192.168.0.3", 0, 0).with_tsaps(Tsap::new(0x0100), Tsap::new(0x0200));
    println!("LOGO! config: {:?}", logo.addressing);

    let mut client = Client::new(config);
    client.set_param(PARAM_PDU_REQUEST, 480)?;
    client.connect()?;

    // =========================================================================
    // System Information
    // =========================================================================

    println!("\n=== System information ===\n");

    let order = client.get_order_code()?;
    println!("Order code: {} V{}", order.code.trim(), order.version());

    let cpu = client.get_cpu_info()?;
    println!("Module:     {}", cpu.module_type_name.trim());
    println!("Serial:     {}", cpu.serial_number.trim());
    println!("AS name:    {}", cpu.as_name.trim());

    match client.get_cp_info() {
        Ok(cp) => println!("Max PDU:    {}, connections: {}", cp.max_pdu_length, cp.max_connections),
        Err(e) => println!("CP info unavailable: {e}"),
    }

    let protection = client.get_protection()?;
    println!("Protection level: {}", protection.sch_rel);

    let info = client.get_ag_block_info(BlockType::DB, 1)?;
    println!("DB1: {} bytes, author \"{}\"", info.mc7_size, info.author);

    // =========================================================================
    // Clock
    // =========================================================================

    println!("\n=== Clock ===\n");

    println!("PLC time: {}", client.get_plc_date_time()?);
    client.set_plc_system_date_time()?;
    println!("PLC time after sync: {}", client.get_plc_date_time()?);

    // =========================================================================
    // Run/Stop Control
    // =========================================================================

    println!("\n=== Control ===\n");

    let status = client.plc_get_status()?;
    println!("CPU is {status}");

    if status == CpuStatus::Run {
        client.plc_stop()?;
        println!("CPU stopped");
    }

    match client.plc_hot_start() {
        Ok(()) => println!("CPU restarted"),
        Err(S7Error::AlreadyRun) => println!("CPU was already running"),
        Err(S7Error::NeedPassword) => {
            client.set_session_password("secret")?;
            client.plc_hot_start()?;
            client.clear_session_password()?;
        }
        Err(e) => println!("Restart failed (0x{:08X}): {e}", e.code()),
    }

    client.disconnect();
    println!("\nControl example completed!");
    Ok(())
}
