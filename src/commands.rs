use chrono::NaiveDate;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Sign in; the password is read from CAMPUS_ADMIN_PASSWORD
  Login { username: String },
  /// Sign out and forget the stored session
  Logout,
  /// Show the signed-in user
  Whoami,
  /// Show or flip the colour theme
  Theme {
    #[arg(long)]
    toggle: bool,
  },
  /// Marketplace products and the price bot
  #[command(subcommand)]
  Products(ProductsCommand),
  /// Marketplace orders
  #[command(subcommand)]
  Orders(OrdersCommand),
  /// Price change history
  #[command(subcommand)]
  Logs(LogsCommand),
  #[command(subcommand)]
  Organizations(OrganizationsCommand),
  #[command(subcommand)]
  Courses(CoursesCommand),
  /// Course groups
  #[command(subcommand)]
  Groups(GroupsCommand),
  #[command(subcommand)]
  Attendance(AttendanceCommand),
  /// Headline numbers
  Dashboard,
}

#[derive(Subcommand, Debug)]
pub enum ProductsCommand {
  List {
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = 10)]
    page_size: u32,
    #[arg(long)]
    search: Option<String>,
    /// Only products the bot manages (true) or ignores (false)
    #[arg(long)]
    bot: Option<bool>,
    #[arg(long)]
    active: Option<bool>,
    /// Only products priced below their minimum on the marketplace
    #[arg(long)]
    below_min: Option<bool>,
    #[arg(long)]
    ordering: Option<String>,
  },
  SetMinPrice { id: String, price: f64 },
  /// Hand a product to the bot, or take it back with --off
  Toggle {
    id: String,
    #[arg(long)]
    off: bool,
  },
  /// Pull the catalogue from the marketplace
  Sync,
  ActivateAll,
  Activate {
    offer_id: String,
    old_price: String,
    retail_price: String,
    qty: String,
  },
  Deactivate { offer_id: String },
}

#[derive(Subcommand, Debug)]
pub enum OrdersCommand {
  List {
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = 10)]
    page_size: u32,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    ordering: Option<String>,
  },
  States,
  Sync,
}

#[derive(Subcommand, Debug)]
pub enum LogsCommand {
  List {
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = 50)]
    page_size: u32,
    #[arg(long)]
    search: Option<String>,
  },
  /// Download the spreadsheet export
  Export {
    #[arg(short, long, default_value = "price-changes.xlsx")]
    output: PathBuf,
  },
}

#[derive(Subcommand, Debug)]
pub enum OrganizationsCommand {
  List {
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    city: Option<String>,
  },
  Mine,
  Branches { id: u64 },
  Stats,
}

#[derive(Subcommand, Debug)]
pub enum CoursesCommand {
  List {
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    branch: Option<u64>,
  },
  Show { id: u64 },
  Groups { id: u64 },
  MyGroups,
  /// Groups that are running or about to start
  Upcoming,
}

#[derive(Subcommand, Debug)]
pub enum GroupsCommand {
  List {
    #[arg(long)]
    course: Option<u64>,
    #[arg(long)]
    status: Option<String>,
  },
  Show { id: u64 },
  Students { id: u64 },
  Schedule { id: u64 },
  Availability { id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum AttendanceCommand {
  List {
    #[arg(long)]
    group: Option<u64>,
    /// YYYY-MM-DD
    #[arg(long)]
    date: Option<NaiveDate>,
  },
  Mine,
  Stats {
    #[arg(long)]
    group: Option<u64>,
  },
}
