//! # Seed Data Loader
//!
//! Prepares a SicargaBox database for development or a fresh install.
//!
//! ## Usage
//! ```bash
//! # Default parameters + built-in sample schedule
//! cargo run -p sicarga-db --bin seed
//!
//! # Import the full tariff schedule
//! cargo run -p sicarga-db --bin seed -- --tariffs ./data/partidas.csv
//!
//! # Create a staff account (and its client profile)
//! cargo run -p sicarga-db --bin seed -- --admin admin:admin@sicargabox.com:Cambiar.2024
//!
//! # Specify database path
//! cargo run -p sicarga-db --bin seed -- --db ./data/sicarga.db
//! ```
//!
//! Every step is idempotent: parameters are only inserted when missing,
//! tariff lines are upserted by item number and an existing admin
//! username is left alone.

use std::env;
use std::fs::File;

use anyhow::{bail, Context};
use sicarga_core::validation::{validate_email, validate_password, validate_username};
use sicarga_core::{NewClient, NewUser};
use sicarga_db::{hash_password, import_schedule, Database, DbConfig};

/// A handful of common courier lines, used when no CSV is given.
const SAMPLE_SCHEDULE: &str = "\
Codigo,partida,dai,isc,ispc,isv,padre,nivel
8471.30.00.00,Máquinas automáticas para tratamiento de datos portátiles (laptops),0,0,0,0.15,8471.30,4
8517.13.00.00,Teléfonos inteligentes (smartphones),0,0,0,0.15,8517.13,4
8528.72.00.00,Televisores,0.15,0,0,0.15,8528.72,4
8518.30.00.00,Auriculares y audífonos,0.10,0,0,0.15,8518.30,4
6109.10.00.00,Camisetas de punto de algodón,0.15,0,0,0.15,6109.10,4
6403.99.00.00,Calzado con suela de caucho y parte superior de cuero,0.15,0,0,0.15,6403.99,4
4202.92.00.00,Mochilas y bolsos de viaje,0.15,0,0,0.15,4202.92,4
9503.00.00.00,Juguetes,0.05,0,0,0.15,9503.00,4
3304.99.00.00,Preparaciones de belleza y maquillaje,0.15,0,0,0.15,3304.99,4
2106.90.00.00,Suplementos alimenticios,0.10,0,0,0.15,2106.90,4
9102.11.00.00,Relojes de pulsera,0.05,0.10,0,0.15,9102.11,4
8504.40.00.00,Cargadores y convertidores estáticos,0,0,0,0.15,8504.40,4
";

struct AdminSpec {
    username: String,
    email: String,
    password: String,
}

fn parse_admin(text: &str) -> anyhow::Result<AdminSpec> {
    let mut parts = text.splitn(3, ':');
    let (Some(username), Some(email), Some(password)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("--admin expects USER:EMAIL:PASSWORD");
    };

    validate_username(username)?;
    validate_email(email)?;
    validate_password(password, username)?;

    Ok(AdminSpec {
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    })
}

fn print_help() {
    println!("SicargaBox Seed Loader");
    println!();
    println!("Usage: seed [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>                 Database file path (default: ./sicarga_dev.db)");
    println!("  -t, --tariffs <CSV>             Tariff schedule to import (default: built-in sample)");
    println!("      --admin <USER:EMAIL:PASS>   Create a staff account");
    println!("  -h, --help                      Show this help message");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sicarga_db=warn".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./sicarga_dev.db");
    let mut tariffs: Option<String> = None;
    let mut admin: Option<AdminSpec> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--tariffs" | "-t" => {
                if i + 1 < args.len() {
                    tariffs = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--admin" => {
                if i + 1 < args.len() {
                    admin = Some(parse_admin(&args[i + 1])?);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => bail!("Unknown argument: {} (try --help)", other),
        }
        i += 1;
    }

    println!("🌱 SicargaBox Seed Loader");
    println!("=========================");
    println!("Database: {}", db_path);
    println!(
        "Tariffs:  {}",
        tariffs.as_deref().unwrap_or("(built-in sample)")
    );
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Parameters
    let inserted = db.parameters().seed_defaults().await?;
    println!("✓ Parameters: {} inserted", inserted);

    // Tariff schedule
    let start = std::time::Instant::now();
    let summary = match &tariffs {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Cannot open {}", path))?;
            import_schedule(&db.tariffs(), file).await?
        }
        None => import_schedule(&db.tariffs(), SAMPLE_SCHEDULE.as_bytes()).await?,
    };
    println!(
        "✓ Tariff lines: {} inserted, {} updated, {} skipped ({:.2}s)",
        summary.inserted,
        summary.updated,
        summary.skipped,
        start.elapsed().as_secs_f64()
    );

    // Staff account
    if let Some(account) = admin {
        let users = db.users();
        if users.username_exists(&account.username).await? {
            println!("⚠ User '{}' already exists, leaving it untouched", account.username);
        } else {
            let user = users
                .create(&NewUser {
                    username: account.username.clone(),
                    email: account.email.clone(),
                    first_name: "Administrador".to_string(),
                    last_name: "SicargaBox".to_string(),
                    password_hash: hash_password(&account.password)?,
                    is_staff: true,
                })
                .await?;

            let prefix = db.parameters().client_code_prefix().await?;
            let client = db.clients().create(&NewClient::for_user(&user), &prefix).await?;
            println!(
                "✓ Staff user '{}' created (client {})",
                user.username,
                client.client_code.as_deref().unwrap_or("-")
            );
        }
    }

    println!();
    println!("📊 Database Statistics:");
    println!("   Tariff lines: {}", db.tariffs().count().await?);
    println!("   Parameters:   {}", db.parameters().list().await?.len());
    println!("   Clients:      {}", db.clients().count().await?);

    db.close().await;
    println!();
    println!("✅ Seed complete!");

    Ok(())
}
