//! # Seed Data Generator
//!
//! Populates the database with categories and products for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default development database
//! cargo run -p kasir-db --bin seed
//!
//! # Specify database path
//! cargo run -p kasir-db --bin seed -- --db ./data/kasir.db
//!
//! # Give every product a fixed starting stock
//! cargo run -p kasir-db --bin seed -- --stock 50
//! ```
//!
//! ## Generated Catalog
//! One category per entry in [`CATALOG`], each with a handful of products.
//! Prices are in cents. Stock defaults to a spread of 0..=40 so sold-out
//! products exist for manual testing.

use std::env;

use kasir_core::validation::{validate_category, validate_product};
use kasir_core::{CategoryInput, ProductInput};
use kasir_db::{Database, DbConfig};

/// (category, description, [(product, price_cents)])
const CATALOG: &[(&str, &str, &[(&str, i64)])] = &[
    (
        "Minuman",
        "Hot and cold drinks",
        &[
            ("Kopi Hitam", 800),
            ("Kopi Susu", 1200),
            ("Es Teh Manis", 500),
            ("Teh Tarik", 900),
            ("Jus Jeruk", 1500),
            ("Air Mineral", 400),
        ],
    ),
    (
        "Makanan",
        "Meals and rice dishes",
        &[
            ("Nasi Goreng", 2500),
            ("Mie Goreng", 2200),
            ("Nasi Uduk", 1800),
            ("Soto Ayam", 2300),
        ],
    ),
    (
        "Camilan",
        "Snacks",
        &[
            ("Keripik Singkong", 700),
            ("Pisang Goreng", 600),
            ("Roti Bakar", 1300),
            ("Martabak Mini", 1000),
        ],
    ),
];

const USAGE: &str = "\
Kasir POS Seed Data Generator

Usage: seed [OPTIONS]

Options:
  -d, --db <PATH>    Database file path (default: ./kasir_dev.db)
  -s, --stock <N>    Starting stock for every product
  -h, --help         Show this help message";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Seed {
        db_path: String,
        fixed_stock: Option<i64>,
    },
    Help,
}

/// Parses `args` (without the program name). Missing or malformed option
/// values are errors rather than silently falling back to defaults.
fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut db_path = String::from("./kasir_dev.db");
    let mut fixed_stock: Option<i64> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                let value = args.get(i + 1).ok_or("--db needs a path")?;
                db_path = value.clone();
                i += 1;
            }
            "--stock" | "-s" => {
                let value = args.get(i + 1).ok_or("--stock needs a number")?;
                let stock = value
                    .parse::<i64>()
                    .map_err(|_| format!("invalid --stock value {value:?}: expected a whole number"))?;
                fixed_stock = Some(stock);
                i += 1;
            }
            "--help" | "-h" => return Ok(Command::Help),
            other => return Err(format!("unknown option {other:?}")),
        }
        i += 1;
    }

    Ok(Command::Seed {
        db_path,
        fixed_stock,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();

    let (db_path, fixed_stock) = match parse_args(&args) {
        Ok(Command::Seed {
            db_path,
            fixed_stock,
        }) => (db_path, fixed_stock),
        Ok(Command::Help) => {
            println!("{USAGE}");
            return Ok(());
        }
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!();
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    println!("🌱 Kasir POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.categories().list().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} categories", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut generated = 0usize;
    for (category_name, description, products) in CATALOG {
        let category_input = CategoryInput {
            name: category_name.to_string(),
            description: Some(description.to_string()),
        };
        validate_category(&category_input)?;
        let category = db.categories().insert(&category_input).await?;
        println!("  + {} (id {})", category.name, category.id);

        for (name, price_cents) in products.iter() {
            let input = ProductInput {
                name: name.to_string(),
                price_cents: *price_cents,
                stock: fixed_stock.unwrap_or(((generated * 7) % 41) as i64),
                category_id: category.id,
            };
            validate_product(&input)?;

            if let Err(e) = db.products().insert(&input).await {
                eprintln!("Failed to insert {}: {}", input.name, e);
                continue;
            }
            generated += 1;
        }
    }

    println!();
    println!("✓ Generated {} categories, {} products", CATALOG.len(), generated);

    db.close().await;
    println!("✓ Seed complete!");

    Ok(())
}
