// Console client for the blackjack server.
//
// Asks for a username until the server accepts one, then prints every table
// event as `>> text`. When the server says it is our turn, prompts until the
// player types `hit`, `stand` or `leave`. Leaving exits the process once the
// server has acknowledged it.
//
// Usage:
//   client [--addr <HOST:PORT>]    (default: 127.0.0.1:9212)

use std::io::{self, BufRead, Write};
use std::net::SocketAddr;

use anyhow::{Context, bail};
use blackjack_protocol::{ActionKind, ServerMessage};
use blackjack_server::{BlackjackClient, ClientError, Subscription};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "client")]
#[command(about = "Play blackjack against the table server")]
struct Args {
    /// Server address
    #[arg(long, default_value = "127.0.0.1:9212")]
    addr: SocketAddr,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let client = BlackjackClient::new(args.addr);
    let mut input = io::stdin().lock();

    print_introduction();
    let mut subscription = choose_username(&client, &mut input)?;

    loop {
        let msg = subscription
            .recv()
            .context("lost connection to the server")?;
        match msg {
            ServerMessage::Event { event } => println!(">> {event}"),
            ServerMessage::NeedsInput => {
                let kind = choose_action(&mut input)?;
                client
                    .perform_action(subscription.username(), kind)
                    .context("failed to send action")?;
                if kind == ActionKind::Leave {
                    println!("Thanks for playing!");
                    return Ok(());
                }
            }
            other => bail!("unexpected message from server: {other:?}"),
        }
    }
}

fn print_introduction() {
    println!("Welcome to multiplayer blackjack.");
    println!();
    println!("Everyone at the table plays against the dealer. When it is your");
    println!("turn you will be asked to hit, stand or leave.");
    println!();
    println!("Please type 'leave' on your turn to quit rather than pressing Ctrl-C.");
    println!();
}

fn read_line(input: &mut impl BufRead) -> anyhow::Result<String> {
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("stdin closed");
    }
    Ok(line.trim().to_owned())
}

fn choose_username(
    client: &BlackjackClient,
    input: &mut impl BufRead,
) -> anyhow::Result<Subscription> {
    loop {
        println!("Which username do you want to use?");
        let username = read_line(input)?;
        match client.subscribe(&username) {
            Ok(subscription) => {
                println!();
                return Ok(subscription);
            }
            Err(ClientError::AlreadyExists) => {
                println!("That username is already in use! Try again.");
                println!();
            }
            Err(ClientError::Rejected(reason)) => {
                println!("{reason}. Try again.");
                println!();
            }
            Err(e) => {
                let context = format!("could not join {}", client.addr());
                return Err(anyhow::Error::new(e).context(context));
            }
        }
    }
}

fn choose_action(input: &mut impl BufRead) -> anyhow::Result<ActionKind> {
    loop {
        println!();
        println!("What would you like to do? ('hit', 'stand' or 'leave')");
        let line = read_line(input)?;
        println!();
        match line.parse() {
            Ok(kind) => return Ok(kind),
            Err(_) => {
                println!("Invalid input! Try again.");
            }
        }
    }
}
