use std::sync::Arc;

use anyhow::{bail, Context, Result};
use catalog::{strip_control, CardTile, FilterPatch, ListingRow, PowerInput};
use clap::{Parser, Subcommand};
use client_core::{
    controller::{PasswordRequirements, ToastKind, UiEvent, View},
    load_settings, MarketClient, MarketplaceController,
};
use shared::{domain::Card, protocol::SortBy};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Browse and trade on the card marketplace")]
struct Cli {
    /// Overrides `base_url` from market.toml and the environment.
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long, env = "MARKET_EMAIL")]
    email: Option<String>,
    #[arg(long, env = "MARKET_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search and filter the card catalog.
    Templates {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        faction: Option<String>,
        #[arg(long)]
        rarity: Option<String>,
        #[arg(long)]
        power_min: Option<String>,
        #[arg(long)]
        power_max: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        sort: Option<String>,
        /// Print the visible page as JSON.
        #[arg(long)]
        json: bool,
    },
    Listings {
        name: String,
    },
    Buy {
        name: String,
        number: i64,
    },
    Sell {
        name: String,
        number: i64,
        price: String,
    },
    Quicksell {
        name: String,
        number: i64,
    },
    Packs,
    OpenPack {
        name: String,
    },
    Collection,
    Balance,
    Register {
        username: String,
        email: String,
        password: String,
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Report which password rules a candidate meets.
    CheckPassword {
        password: String,
    },
}

fn clean(text: &str) -> String {
    strip_control(text)
}

fn print_cards(cards: &[Card]) {
    if cards.is_empty() {
        println!("(no cards)");
    }
    for card in cards {
        println!(
            "#{:<5} {} [{}] {} power {}",
            card.number,
            clean(&card.card_template.name),
            clean(&card.card_template.faction),
            clean(&card.card_template.rarity),
            card.card_template.power
        );
    }
}

async fn ensure_catalog(controller: &mut MarketplaceController<MarketClient>) -> Result<()> {
    if controller.state().catalog.snapshot().is_empty() {
        controller.load_templates().await?;
    }
    Ok(())
}

fn report(events: &[UiEvent]) {
    for event in events {
        if let UiEvent::Toast(toast) = event {
            if toast.kind == ToastKind::Success {
                eprintln!("{}", clean(&toast.message));
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    if let Command::CheckPassword { password } = &cli.command {
        let report = PasswordRequirements::check(password);
        if report.is_satisfied() {
            println!("password meets all requirements");
        } else {
            for rule in report.unmet() {
                println!("missing: {rule}");
            }
        }
        return Ok(());
    }

    let mut settings = load_settings();
    if let Some(base_url) = cli.base_url.as_deref() {
        settings.base_url = base_url.trim().trim_end_matches('/').to_string();
    }
    if let Command::Templates {
        sort: Some(sort), ..
    } = &cli.command
    {
        settings.default_sort = match SortBy::parse(sort) {
            Some(sort) => sort,
            None => bail!("unknown sort field '{sort}'"),
        };
    }

    let client = MarketClient::from_settings(&settings)
        .with_context(|| format!("invalid backend url {}", settings.base_url))?;
    tracing::debug!(base_url = %settings.base_url, sort = %settings.default_sort, "marketplace client ready");
    let mut controller = MarketplaceController::new(Arc::new(client), settings);
    let events = controller.events();

    if let (Some(email), Some(password)) = (cli.email.as_deref(), cli.password.as_deref()) {
        let outcome = controller.sign_in(email, password).await;
        report(&events.try_iter().collect::<Vec<_>>());
        outcome?;
    }

    let outcome = run(&mut controller, cli.command).await;
    controller.pump_client_events();
    report(&events.try_iter().collect::<Vec<_>>());
    outcome
}

async fn run(controller: &mut MarketplaceController<MarketClient>, command: Command) -> Result<()> {
    match command {
        Command::Templates {
            search,
            faction,
            rarity,
            power_min,
            power_max,
            page,
            sort: _,
            json,
        } => {
            ensure_catalog(controller).await?;

            let mut patch = FilterPatch::default();
            if let Some(faction) = faction {
                patch = patch.faction(faction);
            }
            if let Some(rarity) = rarity {
                patch = patch.rarity(rarity);
            }
            if let Some(raw) = power_min.as_deref() {
                patch = patch.power_min(PowerInput::parse(raw));
            }
            if let Some(raw) = power_max.as_deref() {
                patch = patch.power_max(PowerInput::parse(raw));
            }
            controller.set_filters(patch);
            if let Some(query) = search.as_deref() {
                controller.type_search(query);
                controller.submit_search();
            }
            controller.go_to_page(page);

            let view = controller.state().catalog.view();
            if json {
                println!("{}", serde_json::to_string_pretty(&view.items)?);
                return Ok(());
            }
            println!("{} | {}", view.range_label(), view.page_label());
            for tile in view.items.iter().map(CardTile::from_template) {
                println!(
                    "{} [{}] {} {} power {} | {}",
                    clean(&tile.name),
                    clean(&tile.faction),
                    clean(&tile.rarity),
                    clean(&tile.card_type),
                    tile.power,
                    tile.listings_label
                );
            }
        }
        Command::Listings { name } => {
            ensure_catalog(controller).await?;
            controller.select_template(&name).await?;
            let listings = &controller.state().listings;
            if listings.is_empty() {
                println!("No listings for {}", clean(&name));
            }
            for row in listings.iter().map(ListingRow::from_listing) {
                let seller = if row.first_time_sale {
                    format!("{} (First-time sale)", row.seller)
                } else {
                    row.seller
                };
                println!("{:<6} {:>8} coins  {}", row.card_number, row.price, clean(&seller));
            }
        }
        Command::Buy { name, number } => {
            ensure_catalog(controller).await?;
            controller.select_template(&name).await?;
            controller.buy_card(&name, number).await?;
            if let Some(balance) = controller.state().balance() {
                println!("balance: {balance}");
            }
        }
        Command::Sell {
            name,
            number,
            price,
        } => {
            controller.sell_card(&name, number, &price).await?;
        }
        Command::Quicksell { name, number } => {
            controller.quicksell_card(&name, number).await?;
            if let Some(balance) = controller.state().balance() {
                println!("balance: {balance}");
            }
        }
        Command::Packs => {
            controller.show_view(View::Packs).await?;
            for pack in &controller.state().packs {
                let rates: Vec<String> = pack
                    .drop_rates()
                    .iter()
                    .map(|rate| format!("{} {}", rate.rarity, rate.label()))
                    .collect();
                println!(
                    "{} | {} coins | {} cards | {}",
                    clean(&pack.name),
                    pack.price,
                    pack.number_of_cards,
                    rates.join(", ")
                );
            }
        }
        Command::OpenPack { name } => {
            controller.open_pack(&name).await?;
            print_cards(&controller.state().pack_results);
        }
        Command::Collection => {
            controller.show_view(View::Collection).await?;
            print_cards(&controller.state().collection);
        }
        Command::Balance => {
            if !controller.state().is_logged_in() {
                bail!("Please log in to view your balance");
            }
            controller.refresh_balance().await;
            if let Some(balance) = controller.state().balance() {
                println!("{balance}");
            }
        }
        Command::Register {
            username,
            email,
            password,
            confirm,
        } => {
            let confirm = confirm.unwrap_or_else(|| password.clone());
            controller
                .register(&username, &email, &password, &confirm)
                .await?;
        }
        Command::CheckPassword { .. } => {}
    }
    Ok(())
}
