use std::error::Error;
use std::path::Path;
use std::process::exit;
use std::str::FromStr;

use clap::Parser;
use email_address::EmailAddress;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use outlay::{PasswordHash, ValidatedPassword, create_user, initialize_db};

/// A utility for creating a test database for the Outlay server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let connection = Connection::open(output_path)?;

    initialize_db(&connection)?;

    println!("Creating test user...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;

    let user = create_user(
        EmailAddress::from_str("test@example.com")?,
        "Test",
        password_hash,
        &connection,
    )?;

    println!("Adding sample expenses...");

    let today = OffsetDateTime::now_utc().date();

    let sample_expenses = [
        (82.50, "Groceries", "Weekly shop", 2_i64),
        (18.00, "Transport", "Bus fares", 3),
        (45.99, "Clothing", "Rain jacket", 6),
        (130.45, "Bills", "Power bill", 9),
        (64.30, "Groceries", "Weekly shop", 9),
        (26.00, "Leisure", "Movie night", 12),
        (15.50, "Food", "Friday takeaways", 16),
        (200.00, "Savings", "Emergency fund top up", 20),
        (58.00, "Health", "GP visit", 34),
        (71.20, "Groceries", "Weekly shop", 37),
        (12.00, "Others", "Raffle tickets", 41),
    ];

    for (amount, category, description, days_ago) in sample_expenses {
        let date = today - Duration::days(days_ago);

        connection.execute(
            "INSERT INTO expense (amount, date, description, category, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (amount, date, description, category, user.id.as_i64()),
        )?;
    }

    println!("Success! Log in with the email 'test@example.com' and the password 'test'.");

    Ok(())
}
