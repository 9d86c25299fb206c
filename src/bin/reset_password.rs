//! An admin tool that resets a user's password from the command line.

use clap::Parser;
use rusqlite::Connection;

use coinpurse::{
    PasswordHash, ValidatedPassword, get_user_by_username, update_user_password,
};

/// Reset the password of a coinpurse user.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The name of the user whose password should be reset.
    #[arg(long)]
    username: String,
}

fn main() {
    let args = Args::parse();

    let connection = Connection::open(&args.db_path).expect("Could not open database");

    let user = match get_user_by_username(&args.username, &connection) {
        Ok(user) => user,
        Err(error) => {
            eprintln!("Could not find user '{}': {error}", args.username);
            std::process::exit(1);
        }
    };

    let password = rpassword::prompt_password("New password: ").expect("Could not read password");
    let confirm_password =
        rpassword::prompt_password("Confirm password: ").expect("Could not read password");

    if password != confirm_password {
        eprintln!("Passwords do not match.");
        std::process::exit(1);
    }

    let validated_password = match ValidatedPassword::new(&password) {
        Ok(password) => password,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };

    let password_hash = PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST)
        .expect("Could not hash password");

    update_user_password(user.id, password_hash, &connection)
        .expect("Could not update the stored password");

    println!("Password updated for '{}'.", args.username);
}
