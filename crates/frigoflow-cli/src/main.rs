//! FrigoFlow CLI
//!
//! Thin wrapper around frigoflow-core for command-line usage.
//!
//! ## Usage
//!
//! ```bash
//! # Start a family and invite someone
//! frigoflow --user alice family create "Dupont" "Alice"
//! frigoflow --user alice family invite
//! frigoflow --user bob family join K7M2QX9P "Bob"
//!
//! # Lists and items
//! frigoflow --user alice list create "Courses"
//! frigoflow --user alice item add <list_id> "Milk" --qty 2 --unit l --price 1.60
//! frigoflow --user bob item toggle <item_id>
//!
//! # Follow a list live; stdin lines are applied while watching
//! frigoflow --user alice watch <list_id>
//! > add Eggs
//! > @bob toggle <item_id>
//! > rm <item_id>
//!
//! # Look up a barcode
//! frigoflow lookup 3274080005003
//! ```

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use frigoflow_core::session::{self, DATABASE_FILE};
use frigoflow_core::{
    logging, BootstrapOutcome, FrigoConfig, ItemId, ListId, ListItem, LocalBackend, NewItem,
    OpenFoodFactsClient, ProductLookup, Session, UserId,
};
use tracing::debug;

/// FrigoFlow - shared family shopping lists
#[derive(Parser)]
#[command(name = "frigoflow")]
#[command(version)]
#[command(about = "FrigoFlow - shared family shopping lists")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Data directory (default: ~/.frigoflow/data)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Signed-in user id
    #[arg(short, long, global = true, env = "FRIGOFLOW_USER")]
    user: Option<String>,

    /// Also write JSONL logs into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show session information
    Info,

    /// Family management
    Family {
        #[command(subcommand)]
        action: FamilyAction,
    },

    /// Shopping list management
    List {
        #[command(subcommand)]
        action: ListAction,
    },

    /// List item management
    Item {
        #[command(subcommand)]
        action: ItemAction,
    },

    /// Follow a list and print it on every change.
    ///
    /// While watching, stdin lines `add <label>`, `toggle <item_id>` and
    /// `rm <item_id>` are applied to the list, optionally prefixed with
    /// `@<user>` to act as another family member.
    Watch {
        /// List ID
        list_id: String,
        /// Stop after this many seconds (default: until Ctrl+C)
        #[arg(long)]
        for_secs: Option<u64>,
    },

    /// Look up a product by barcode
    Lookup {
        /// EAN / GTIN barcode
        ean: String,
    },
}

#[derive(Subcommand)]
enum FamilyAction {
    /// Create a family with yourself as first member
    Create {
        /// Family name
        family: String,
        /// Your display name
        name: String,
    },
    /// Create a single-use invite code for your family
    Invite,
    /// Join a family with an invite code
    Join {
        /// Invite code
        code: String,
        /// Your display name
        name: String,
    },
    /// List the members of your family
    Members,
}

#[derive(Subcommand)]
enum ListAction {
    /// Create a new list
    Create {
        /// Name of the list
        name: String,
    },
    /// Show all lists of your family
    All,
    /// Show the items of a list
    Show {
        /// List ID
        list_id: String,
    },
}

#[derive(Subcommand)]
enum ItemAction {
    /// Add an item to a list
    Add {
        /// List ID
        list_id: String,
        /// What to buy
        label: String,
        /// Quantity
        #[arg(long, default_value_t = 1.0)]
        qty: f64,
        /// Unit (default: pcs)
        #[arg(long)]
        unit: Option<String>,
        /// Unit price in CHF
        #[arg(long)]
        price: Option<f64>,
    },
    /// Check or uncheck an item
    Toggle {
        /// Item ID
        item_id: String,
    },
    /// Remove an item
    Remove {
        /// Item ID
        item_id: String,
    },
}

/// Get the default data directory (~/.frigoflow/data)
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".frigoflow")
        .join("data")
}

fn print_items(items: &[ListItem]) {
    if items.is_empty() {
        println!("No items on this list.");
        return;
    }
    for item in items {
        let status = if item.checked { "✓" } else { "○" };
        let price = item
            .price
            .map(|p| format!("  {}", session::format_price(p * item.qty)))
            .unwrap_or_default();
        println!(
            "  {} {} {} {} {}{}",
            status, item.id, item.label, item.qty, item.unit, price
        );
    }
    println!();
    println!(
        "Total: {}  ({}/{} checked, {:.0}%)",
        session::format_price(session::list_total(items)),
        session::checked_count(items),
        items.len(),
        session::progress(items)
    );
}

/// A list edit typed while watching
#[derive(Debug, PartialEq)]
enum WatchCommand {
    Add(String),
    Toggle(ItemId),
    Remove(ItemId),
}

/// Parse `[@user] add <label> | toggle <item_id> | rm <item_id>`
fn parse_watch_command(line: &str) -> Result<(Option<UserId>, WatchCommand)> {
    let mut rest = line.trim();
    let mut actor = None;
    if let Some(tagged) = rest.strip_prefix('@') {
        let (user, tail) = tagged.split_once(char::is_whitespace).unwrap_or((tagged, ""));
        if user.is_empty() {
            anyhow::bail!("Missing user after '@'");
        }
        actor = Some(UserId::from(user));
        rest = tail.trim_start();
    }

    let (verb, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let arg = arg.trim();
    if arg.is_empty() {
        anyhow::bail!("Usage: [@user] add <label> | toggle <item_id> | rm <item_id>");
    }
    let command = match verb {
        "add" => WatchCommand::Add(arg.to_string()),
        "toggle" => WatchCommand::Toggle(ItemId::from(arg)),
        "rm" | "remove" => WatchCommand::Remove(ItemId::from(arg)),
        other => anyhow::bail!("Unknown command '{}'", other),
    };
    Ok((actor, command))
}

/// Run one stdin line through `session` (or a session for the `@user`)
fn apply_watch_command(session: &Session, list_id: &ListId, line: &str) -> Result<String> {
    let (actor, command) = parse_watch_command(line)?;
    let acting;
    let session = match actor {
        Some(user) => {
            acting = Session::new(session.backend().clone(), Some(user), session.config().clone());
            &acting
        }
        None => session,
    };

    let done = match command {
        WatchCommand::Add(label) => {
            let item = session.add_item(list_id, NewItem::new(label))?;
            format!("Added item: {} ({})", item.label, item.id)
        }
        WatchCommand::Toggle(item_id) => {
            let item = session.toggle_item(&item_id)?;
            format!("Toggled item: {}", item.label)
        }
        WatchCommand::Remove(item_id) => {
            session.delete_item(&item_id)?;
            format!("Removed item: {}", item_id)
        }
    };
    Ok(done)
}

/// Stdin lines, read on a plain thread so a pending read never holds up
/// runtime shutdown
fn stdin_lines() -> tokio::sync::mpsc::UnboundedReceiver<String> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn watch(session: &Session, list_id: &ListId, for_secs: Option<u64>) -> Result<()> {
    let list = session.list(list_id)?;
    let sync = session.watch_list(&list.id);
    let mut rx = sync.observe();

    let loaded = sync.wait_loaded().await;
    rx.borrow_and_update();
    println!("Watching {} (Ctrl+C to stop)", list.name);
    println!();
    print_items(&loaded.items);

    let deadline = async {
        match for_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut commands = stdin_lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Received shutdown signal...");
                break;
            }
            _ = &mut deadline => break,
            line = commands.recv(), if stdin_open => match line {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match apply_watch_command(session, &list.id, &line) {
                    Ok(done) => println!("> {}", done),
                    Err(e) => eprintln!("Error: {}", e),
                },
                None => {
                    debug!("stdin closed, watching only");
                    stdin_open = false;
                }
            },
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                println!();
                println!("[{}]", chrono::Local::now().format("%H:%M:%S"));
                print_items(&snapshot.items);
            }
        }
    }

    sync.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let config = FrigoConfig::load(&data_dir)?;

    let jsonl = cli
        .log_dir
        .as_deref()
        .map(|dir| (dir, config.device_name.as_str()));
    logging::init(cli.verbose, jsonl)?;

    let backend = Arc::new(LocalBackend::open(data_dir.join(DATABASE_FILE))?);
    let user = cli
        .user
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .map(UserId::from);
    let session = Session::new(backend, user, config);
    debug!(data_dir = %data_dir.display(), "Session opened");

    match cli.command {
        Commands::Info => {
            println!("FrigoFlow v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Data directory: {}", data_dir.display());
            println!("Device: {}", session.config().device_name);
            println!("Product API: {}", session.config().product_api_url);
            println!();
            match session.user() {
                Some(user) => println!("User: {}", user),
                None => println!("User: (not signed in)"),
            }
            match session.bootstrap() {
                BootstrapOutcome::NeedsAuth => {
                    println!("Status: sign in with --user or FRIGOFLOW_USER");
                }
                BootstrapOutcome::NeedsOnboarding => {
                    println!("Status: no family yet (family create / family join)");
                }
                BootstrapOutcome::Ready { member, family_id } => {
                    println!("Status: ready");
                    println!("  Name: {}", member.display_name);
                    println!("  Family: {}", family_id);
                }
            }
        }

        Commands::Family { action } => match action {
            FamilyAction::Create { family, name } => {
                let member = session.create_family(&family, &name)?;
                println!("Created family: {}", family.trim());
                println!("  ID: {}", member.family_id);
            }

            FamilyAction::Invite => {
                let invite = session.create_invite()?;
                println!("Invite code: {}", invite.code);
                println!();
                println!("Share this code; it can be used once.");
            }

            FamilyAction::Join { code, name } => {
                let member = session.accept_invite(&code, &name)?;
                let (family, _) = session.family()?;
                println!("Joined family: {}", family.name);
                println!("  ID: {}", member.family_id);
            }

            FamilyAction::Members => {
                let (family, members) = session.family()?;
                println!("{} ({} members):", family.name, members.len());
                println!();
                for member in members {
                    println!(
                        "  {} {} (joined {})",
                        member.id,
                        member.display_name,
                        member.joined_at.format("%Y-%m-%d")
                    );
                }
            }
        },

        Commands::List { action } => match action {
            ListAction::Create { name } => {
                let list = session.create_list(&name)?;
                println!("Created list: {}", list.name);
                println!("  ID: {}", list.id);
            }

            ListAction::All => {
                let lists = session.lists()?;
                if lists.is_empty() {
                    println!("No lists yet. Create one with: frigoflow list create <name>");
                } else {
                    println!("Lists ({}):", lists.len());
                    println!();
                    for summary in lists {
                        println!(
                            "  {} {} ({}/{} checked)",
                            summary.list.id,
                            summary.list.name,
                            summary.checked_items,
                            summary.items
                        );
                    }
                }
            }

            ListAction::Show { list_id } => {
                let list = session.list(&ListId::from(list_id))?;
                let items = session.backend().storage().items_for_list(&list.id)?;
                println!("{}", list.name);
                println!();
                print_items(&items);
            }
        },

        Commands::Item { action } => match action {
            ItemAction::Add {
                list_id,
                label,
                qty,
                unit,
                price,
            } => {
                let mut new = NewItem::new(label).with_qty(qty);
                if let Some(unit) = unit {
                    new = new.with_unit(unit);
                }
                if let Some(price) = price {
                    new = new.with_price(price);
                }
                let item = session.add_item(&ListId::from(list_id), new)?;
                println!("Added item: {}", item.label);
                println!("  ID: {}", item.id);
            }

            ItemAction::Toggle { item_id } => {
                let item = session.toggle_item(&ItemId::from(item_id))?;
                let status = if item.checked { "checked" } else { "unchecked" };
                println!("Toggled item: {} -> {}", item.label, status);
            }

            ItemAction::Remove { item_id } => {
                session.delete_item(&ItemId::from(item_id.as_str()))?;
                println!("Removed item: {}", item_id);
            }
        },

        Commands::Watch { list_id, for_secs } => {
            watch(&session, &ListId::from(list_id), for_secs).await?;
        }

        Commands::Lookup { ean } => {
            let client = OpenFoodFactsClient::new(session.config().product_api_url.as_str())?;
            match client.lookup(&ean).await {
                Some(product) => {
                    println!(
                        "Product: {}",
                        product.display_name().unwrap_or_else(|| ean.clone())
                    );
                    if let Some(quantity) = product.quantity {
                        println!("  Quantity: {}", quantity);
                    }
                    if let Some(grade) = product.nutriscore_grade {
                        println!("  Nutri-Score: {}", grade.to_uppercase());
                    }
                    if let Some(image) = product.image_url {
                        println!("  Image: {}", image);
                    }
                }
                None => println!("No product found for {}", ean.trim()),
            }
        }
    }

    Ok(())
}
