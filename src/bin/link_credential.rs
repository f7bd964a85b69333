use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;

use caddie_sync::{ProviderCredential, get_or_create_user, initialize_db, set_provider_credential};

/// A utility for linking a provider access token to a user of caddie_sync.
///
/// The access token comes from the provider's token exchange, which happens
/// outside of this service.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The user to link the access token to. The user is created if needed.
    #[arg(long, short)]
    username: String,

    /// The provider access token, e.g. "access-sandbox-...".
    #[arg(long)]
    access_token: Option<String>,

    /// Remove the user's access token instead of setting one.
    #[arg(long, conflicts_with = "access_token")]
    unlink: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let db_path = Path::new(&args.db_path);
    if !db_path.is_file() {
        eprintln!("No database at {db_path:#?}, start the server once to create it.");
        exit(1);
    }

    let conn = Connection::open(db_path)?;
    initialize_db(&conn)?;

    let user = get_or_create_user(&args.username, &conn)?;

    if args.unlink {
        set_provider_credential(user.id, None, &conn)?;
        println!("Unlinked the provider credential for {}.", user.username);
        return Ok(());
    }

    let Some(access_token) = args.access_token else {
        eprintln!("Pass --access-token to link a credential, or --unlink to remove one.");
        exit(1);
    };

    let credential = ProviderCredential::new(&access_token)?;
    set_provider_credential(user.id, Some(&credential), &conn)?;
    println!("Linked a provider credential to {} (user ID {}).", user.username, user.id);

    Ok(())
}
