use clap::Parser;
use client::network::{Client, ClientExit};
use log::info;
use shared::DEFAULT_SERVER_ADDR;
use tokio::io::{stdin, stdout, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = DEFAULT_SERVER_ADDR)]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let client = Client::connect(&args.server).await?;
    println!("Type a guess and press Enter, or 'exit' to quit.");

    let exit = client.run(BufReader::new(stdin()), stdout()).await?;
    info!("Session ended: {:?}", exit);
    if exit == ClientExit::Won {
        println!("Thanks for playing!");
    }

    Ok(())
}
