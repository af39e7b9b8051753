use std::{error::Error, io, process::ExitCode, sync::Arc};

use clap::{Args, Parser, Subcommand, ValueEnum};
use time::{
    Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description,
};

use fintrack::{
    AuthHolder, CascadeAction, CategoryHolder, CategoryId, Config, DashboardHolder,
    TransactionHolder, TransactionId, TransactionKind, UserId,
    category::{Category, Color},
    clear_all_user_data, format_currency,
    holder::CollectionState,
    setup_logging,
    stores::SQLiteDatabase,
    transaction::{Amount, Title, Transaction},
};

/// Track income and expenses from the command line.
#[derive(Parser, Debug)]
#[command(name = "fintrack", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and log in to it.
    SignUp {
        #[arg(long)]
        email: String,
    },
    /// Log in to an existing account.
    LogIn {
        #[arg(long)]
        email: String,
    },
    /// Log out of the current account.
    LogOut,
    /// Show who is logged in.
    Whoami,
    /// Manage categories.
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Manage transactions.
    #[command(subcommand)]
    Transaction(TransactionCommand),
    /// Show income, expense and balance totals plus recent transactions.
    Dashboard {
        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Delete every transaction and category of the current account.
    ClearData {
        /// Confirm that the data should be deleted.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    /// Create a category.
    Add {
        name: String,
        /// The colour as #RRGGBB or #AARRGGBB.
        #[arg(long, default_value_t = Color::DEFAULT)]
        color: Color,
    },
    /// List categories.
    List,
    /// Rename a category.
    Rename { id: CategoryId, name: String },
    /// Delete a category.
    ///
    /// A category that still has transactions needs either `--delete-transactions`
    /// or `--reassign-to`.
    Delete {
        id: CategoryId,
        /// Delete the category's transactions too.
        #[arg(long, conflicts_with = "reassign_to")]
        delete_transactions: bool,
        /// Move the category's transactions to this category.
        #[arg(long)]
        reassign_to: Option<CategoryId>,
    },
}

#[derive(Subcommand, Debug)]
enum TransactionCommand {
    /// Record a transaction.
    Add {
        #[command(flatten)]
        fields: TransactionFields,
    },
    /// List transactions, oldest first.
    List {
        /// Only list transactions in this category.
        #[arg(long)]
        category: Option<CategoryId>,
    },
    /// Change a transaction. Fields that are not given keep their value.
    Edit {
        id: TransactionId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        amount: Option<Amount>,
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
        #[arg(long, conflicts_with = "uncategorised")]
        category: Option<CategoryId>,
        /// Remove the transaction from its category.
        #[arg(long)]
        uncategorised: bool,
        /// When the transaction happened, as YYYY-MM-DD or RFC 3339.
        #[arg(long, value_parser = parse_timestamp)]
        date: Option<OffsetDateTime>,
        /// Replace the note. An empty note removes it.
        #[arg(long)]
        note: Option<String>,
    },
    /// Delete a transaction.
    Delete { id: TransactionId },
}

#[derive(Args, Debug)]
struct TransactionFields {
    #[arg(long)]
    title: String,
    #[arg(long)]
    amount: Amount,
    #[arg(long, value_enum)]
    kind: KindArg,
    #[arg(long)]
    category: Option<CategoryId>,
    /// When the transaction happened, as YYYY-MM-DD or RFC 3339. Defaults to now.
    #[arg(long, value_parser = parse_timestamp)]
    date: Option<OffsetDateTime>,
    #[arg(long)]
    note: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum KindArg {
    Income,
    Expense,
}

impl From<KindArg> for TransactionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Income => TransactionKind::Income,
            KindArg::Expense => TransactionKind::Expense,
        }
    }
}

fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, String> {
    if let Ok(timestamp) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(timestamp);
    }

    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(|date| date.midnight().assume_utc())
        .map_err(|_| format!("\"{raw}\" is not a date (YYYY-MM-DD) or an RFC 3339 timestamp"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = setup_logging(cli.config.log_level, cli.config.log_file.as_deref()) {
        eprintln!("Could not open log file: {error}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let database = SQLiteDatabase::open(&cli.config.db_path)?;
    let auth = AuthHolder::new(Arc::new(database.auth_provider(cli.config.bcrypt_cost))).await;

    let command = match cli.command {
        Command::SignUp { email } => {
            let password = rpassword::prompt_password("Password: ")?;
            let confirmation = rpassword::prompt_password("Confirm password: ")?;
            let session = auth.sign_up(&email, &password, &confirmation).await?;
            println!("Created account for {}", session.email);
            return Ok(());
        }
        Command::LogIn { email } => {
            let password = rpassword::prompt_password("Password: ")?;
            let session = auth.log_in(&email, &password).await?;
            println!("Logged in as {}", session.email);
            return Ok(());
        }
        Command::LogOut => {
            auth.log_out().await?;
            println!("Logged out");
            return Ok(());
        }
        Command::Whoami => {
            match auth.session() {
                Some(session) => println!("{}", session.email),
                None => println!("Not logged in"),
            }
            return Ok(());
        }
        command => command,
    };

    let owner_id = auth
        .session()
        .ok_or(fintrack::Error::NotAuthenticated)?
        .user_id;

    match command {
        Command::Category(command) => run_category(command, &database, owner_id).await,
        Command::Transaction(command) => run_transaction(command, &database, owner_id).await,
        Command::Dashboard { json } => show_dashboard(&database, owner_id, json).await,
        Command::ClearData { yes } => clear_data(&database, owner_id, yes).await,
        // Account commands returned above.
        Command::SignUp { .. } | Command::LogIn { .. } | Command::LogOut | Command::Whoami => {
            Ok(())
        }
    }
}

fn category_holder(database: &SQLiteDatabase, owner_id: UserId) -> CategoryHolder {
    CategoryHolder::new(
        Arc::new(database.category_store()),
        Arc::new(database.transaction_store()),
        owner_id,
    )
}

fn transaction_holder(database: &SQLiteDatabase, owner_id: UserId) -> TransactionHolder {
    TransactionHolder::new(Arc::new(database.transaction_store()), owner_id)
}

/// The cached items, or the error that stopped them from loading.
fn items<T>(state: CollectionState<T>) -> Result<Vec<T>, Box<dyn Error>> {
    match state.error {
        Some(error) => Err(error.into()),
        None => Ok(state.items),
    }
}

async fn run_category(
    command: CategoryCommand,
    database: &SQLiteDatabase,
    owner_id: UserId,
) -> Result<(), Box<dyn Error>> {
    let holder = category_holder(database, owner_id);

    match command {
        CategoryCommand::Add { name, color } => {
            let category = holder.add(&name, color).await?;
            println!("Added category {} ({})", category.name, category.id);
        }
        CategoryCommand::List => {
            let categories = items(holder.loaded().await?)?;

            if categories.is_empty() {
                println!("No categories");
            }

            for category in categories {
                println!("{}  {}  {}", category.id, category.color, category.name);
            }
        }
        CategoryCommand::Rename { id, name } => {
            holder.loaded().await?;
            let category = holder.rename(id, &name).await?;
            println!("Renamed category to {}", category.name);
        }
        CategoryCommand::Delete {
            id,
            delete_transactions,
            reassign_to,
        } => {
            holder.loaded().await?;
            let transactions = items(transaction_holder(database, owner_id).loaded().await?)?;
            let plan = holder.plan_delete(id, &transactions)?;

            let action = match (reassign_to, delete_transactions) {
                (Some(target), _) => CascadeAction::ReassignTransactions(target),
                (None, true) => CascadeAction::DeleteTransactions,
                (None, false) if !plan.has_transactions() => CascadeAction::DeleteTransactions,
                (None, false) => {
                    return Err(cascade_help(
                        &plan.category,
                        plan.transaction_ids.len(),
                        &plan.reassign_candidates,
                    )
                    .into());
                }
            };
            plan.check(&action)?;

            holder
                .cascade_delete(id, &plan.transaction_ids, action)
                .await?;
            println!("Deleted category {}", plan.category.name);
        }
    }

    Ok(())
}

fn cascade_help(category: &Category, count: usize, candidates: &[Category]) -> String {
    let mut help = format!(
        "{} has {count} transaction(s). Pass --delete-transactions",
        category.name
    );

    if candidates.is_empty() {
        help.push_str(", there is no other category to move them to.");
    } else {
        help.push_str(" or --reassign-to with one of:");
        for candidate in candidates {
            help.push_str(&format!("\n  {}  {}", candidate.id, candidate.name));
        }
    }

    help
}

async fn run_transaction(
    command: TransactionCommand,
    database: &SQLiteDatabase,
    owner_id: UserId,
) -> Result<(), Box<dyn Error>> {
    let holder = transaction_holder(database, owner_id);

    match command {
        TransactionCommand::Add { fields } => {
            let title = Title::new(&fields.title)?;
            let mut builder = Transaction::build(title, fields.amount, fields.kind.into())
                .category_id(fields.category)
                .note(fields.note.as_deref());
            if let Some(date) = fields.date {
                builder = builder.occurred_at(date);
            }

            let transaction = holder.add(builder).await?;
            println!("Added transaction {}", transaction.id);
        }
        TransactionCommand::List { category } => {
            let transactions = match category {
                Some(category_id) => {
                    items(holder.loaded().await?)?;
                    holder.by_category(category_id)
                }
                None => items(holder.loaded().await?)?,
            };
            let categories = items(category_holder(database, owner_id).loaded().await?)?;

            print_transactions(&transactions, &categories);
        }
        TransactionCommand::Edit {
            id,
            title,
            amount,
            kind,
            category,
            uncategorised,
            date,
            note,
        } => {
            let mut transaction = items(holder.loaded().await?)?
                .into_iter()
                .find(|transaction| transaction.id == id)
                .ok_or(fintrack::Error::NotFound)?;

            if let Some(title) = title {
                transaction.title = Title::new(&title)?;
            }
            if let Some(amount) = amount {
                transaction.amount = amount;
            }
            if let Some(kind) = kind {
                transaction.kind = kind.into();
            }
            if category.is_some() || uncategorised {
                transaction.category_id = category;
            }
            if let Some(date) = date {
                transaction.occurred_at = date;
            }
            if let Some(note) = note {
                let note = note.trim();
                transaction.note = (!note.is_empty()).then(|| note.to_owned());
            }

            holder.update(transaction).await?;
            println!("Updated transaction {id}");
        }
        TransactionCommand::Delete { id } => {
            holder.delete(id).await?;
            println!("Deleted transaction {id}");
        }
    }

    Ok(())
}

fn print_transactions(transactions: &[Transaction], categories: &[Category]) {
    if transactions.is_empty() {
        println!("No transactions");
        return;
    }

    let date_format = format_description!("[year]-[month]-[day]");

    for transaction in transactions {
        let category = transaction
            .category_id
            .and_then(|id| categories.iter().find(|category| category.id == id))
            .map(|category| category.name.as_ref())
            .unwrap_or("-");
        let date = transaction
            .occurred_at
            .format(date_format)
            .unwrap_or_else(|_| transaction.occurred_at.to_string());
        let amount = match transaction.kind {
            TransactionKind::Income => format_currency(transaction.amount.value()),
            TransactionKind::Expense => format_currency(-transaction.amount.value()),
        };

        println!(
            "{}  {date}  {amount:>12}  {:<16}  {}",
            transaction.id, category, transaction.title
        );
        if let Some(note) = &transaction.note {
            println!("    {note}");
        }
    }
}

async fn show_dashboard(
    database: &SQLiteDatabase,
    owner_id: UserId,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let holder = DashboardHolder::new(Arc::new(database.transaction_store()), owner_id);
    let state = holder.loaded().await?;

    if let Some(error) = state.error {
        return Err(error.into());
    }

    let summary = state.summary;

    if json {
        serde_json::to_writer_pretty(io::stdout(), &summary)?;
        println!();
        return Ok(());
    }

    println!("Income:   {:>14}", format_currency(summary.total_income));
    println!("Expenses: {:>14}", format_currency(summary.total_expense));
    println!("Balance:  {:>14}", format_currency(summary.total_balance));

    if !summary.recent.is_empty() {
        println!();
        println!("Recent transactions");
        let categories = items(category_holder(database, owner_id).loaded().await?)?;
        print_transactions(&summary.recent, &categories);
    }

    Ok(())
}

async fn clear_data(
    database: &SQLiteDatabase,
    owner_id: UserId,
    confirmed: bool,
) -> Result<(), Box<dyn Error>> {
    if !confirmed {
        return Err(
            "This deletes all of your transactions and categories. Pass --yes to confirm.".into(),
        );
    }

    let cleared = clear_all_user_data(
        owner_id,
        &database.category_store(),
        &database.transaction_store(),
    )
    .await?;
    println!(
        "Deleted {} transactions and {} categories",
        cleared.transactions, cleared.categories
    );

    Ok(())
}
