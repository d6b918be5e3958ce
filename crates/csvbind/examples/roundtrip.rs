//! Example: write annotated records to a CSV file and read them back.
//!
//! Usage:
//!   cargo run --example roundtrip -- <output_path>
//!
//! Example:
//!   cargo run --example roundtrip -- /tmp/inventory.csv

use std::env;

use csvbind::{record, CodecConfig, Decoder, Encoder};

#[derive(Debug, Default)]
struct InventoryItem {
    sku: String,
    description: String,
    quantity: u32,
    unit_price: f64,
    warehouses: Vec<String>,
    supplier_notes: String,
}

record!(InventoryItem {
    sku => "SKU",
    description => "Description,limit=24",
    quantity => "Qty,quantity",
    unit_price => "Unit Price",
    warehouses => "Warehouse,span=2",
    supplier_notes => "notes" as transient,
});

fn main() -> csvbind::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cargo run --example roundtrip -- <output_path>");
        std::process::exit(1);
    }
    let path = &args[1];

    let items = vec![
        InventoryItem {
            sku: "BLT-0042".to_string(),
            description: "Hex bolt, zinc plated, M8 x 40mm".to_string(),
            quantity: 1200,
            unit_price: 0.18,
            warehouses: vec!["Reno".to_string(), "Dayton".to_string(), "Tacoma".to_string()],
            supplier_notes: "renegotiate in Q3".to_string(),
        },
        InventoryItem {
            sku: "WSH-0007".to_string(),
            description: "Flat washer".to_string(),
            quantity: 5000,
            unit_price: 0.02,
            warehouses: vec!["Reno".to_string()],
            supplier_notes: String::new(),
        },
    ];

    let encoder = Encoder::create(path, CodecConfig::default())?;
    let written = encoder.encode_all(&items)?;
    encoder.close()?;
    println!("Wrote {} rows to {}", written, path);

    let decoder = Decoder::from_path(path, CodecConfig::default())?;
    for result in decoder.records::<InventoryItem>() {
        let (item, errors) = result?;
        println!("{:?}", item);
        for error in &errors {
            println!("  cell error: {}", error);
        }
    }
    if let Some(headers) = decoder.headers() {
        println!("Header: {}", headers.join(" | "));
    }

    Ok(())
}
