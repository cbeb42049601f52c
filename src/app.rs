use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use campus_admin::api::types::{
  ActivateProduct, AttendanceListParams, CourseGroupListParams, CourseListParams,
  DeactivateProduct, LoginRequest, OrganizationListParams,
};
use campus_admin::api::{
  attendance, auth, course_groups, courses, dashboard, logs, orders, organizations, products, Api,
};
use campus_admin::config::Config;
use campus_admin::http::ApiClient;
use campus_admin::query::{Level, Notification, Notifier, Query, QueryClient};
use campus_admin::session::{
  MemorySessionStore, RedirectToLogin, Session, SessionStore, SqliteSessionStore,
};

use crate::commands::{
  AttendanceCommand, Command, CoursesCommand, GroupsCommand, LogsCommand, OrdersCommand,
  OrganizationsCommand, ProductsCommand,
};

/// Prints notifications to the terminal.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
  fn notify(&self, notification: Notification) {
    match notification.level {
      Level::Success => println!("✓ {}", notification.content),
      Level::Info => println!("ℹ {}", notification.content),
      Level::Error => eprintln!("✗ {}", notification.content),
    }
  }
}

pub struct App {
  api: Api,
  redirect: Arc<RedirectToLogin>,
}

impl App {
  pub fn new(config: &Config, ephemeral: bool) -> Result<Self> {
    let store: Arc<dyn SessionStore> = if ephemeral {
      Arc::new(MemorySessionStore::new())
    } else {
      Arc::new(SqliteSessionStore::open()?)
    };
    let session = Arc::new(Session::restore(store));
    let redirect = Arc::new(RedirectToLogin::new());

    let client = ApiClient::builder(config.api.url.clone())
      .auth_scheme(config.api.auth_scheme)
      .timeout(config.timeout())
      .session(session)
      .events(redirect.clone())
      .build()?;
    info!(url = %client.base_url(), scheme = ?client.auth_scheme(), "Client ready");

    let cache = QueryClient::new().with_stale_time(config.stale_time());
    Ok(Self {
      api: Api::new(client, cache, Arc::new(ConsoleNotifier)),
      redirect,
    })
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    let result = self.dispatch(command).await;
    if let Some(target) = self.redirect.redirected_to() {
      eprintln!("Session ended. Sign in again with `campus-admin login` ({}).", target);
    }
    result
  }

  async fn dispatch(&self, command: Command) -> Result<()> {
    match command {
      Command::Login { username } => {
        let password = Config::get_password()?;
        auth::login_mutation(&self.api)
          .execute(LoginRequest { username, password })
          .await?;
      }
      Command::Logout => auth::logout_mutation(&self.api).execute(()).await?,
      Command::Whoami => {
        self.require_session()?;
        let user = load(auth::current_user_query(&self.api)).await?;
        if let Some(user) = user {
          println!("{} ({})", user.username, user.user_type.label());
          if !user.full_name.is_empty() {
            println!("{}", user.full_name);
          }
          let access = auth::require_admin(&user);
          println!(
            "Admin areas: {}",
            if access.is_granted() { "yes" } else { "no" }
          );
        }
      }
      Command::Theme { toggle } => {
        let session = self.api.client().session();
        let theme = if toggle {
          session.toggle_theme()?
        } else {
          session.theme()
        };
        println!("{}", theme);
      }
      Command::Products(cmd) => self.products(cmd).await?,
      Command::Orders(cmd) => self.orders(cmd).await?,
      Command::Logs(cmd) => self.logs(cmd).await?,
      Command::Organizations(cmd) => self.organizations(cmd).await?,
      Command::Courses(cmd) => self.courses(cmd).await?,
      Command::Groups(cmd) => self.groups(cmd).await?,
      Command::Attendance(cmd) => self.attendance(cmd).await?,
      Command::Dashboard => {
        self.require_session()?;
        if let Some(stats) = load(dashboard::product_count_query(&self.api)).await? {
          println!("Products: {}", stats.count);
        }
      }
    }
    Ok(())
  }

  fn require_session(&self) -> Result<()> {
    if self.api.client().session().is_authenticated() {
      Ok(())
    } else {
      Err(eyre!("Not signed in. Run `campus-admin login <username>` first."))
    }
  }

  async fn products(&self, cmd: ProductsCommand) -> Result<()> {
    self.require_session()?;
    match cmd {
      ProductsCommand::List {
        page,
        page_size,
        search,
        bot,
        active,
        below_min,
        ordering,
      } => {
        let params = products::ProductListParams {
          page,
          page_size,
          search,
          active_to_bot: bot,
          is_active: active,
          mp_price_is_below_min_price: below_min,
          ordering,
        };
        if let Some(page) = load(products::list_query(&self.api, params)).await? {
          for p in &page.results {
            println!(
              "{:<12} {:<40} {:>10.2} min {:>10.2} {}",
              p.id,
              p.name,
              p.price,
              p.min_price,
              if p.active_to_bot { "bot" } else { "-" }
            );
          }
          println!("{} of {}", page.results.len(), page.count);
        }
      }
      ProductsCommand::SetMinPrice { id, price } => {
        products::update_min_price_mutation(&self.api)
          .execute(products::MinPriceChange {
            product_id: id,
            min_price: price,
          })
          .await?;
      }
      ProductsCommand::Toggle { id, off } => {
        products::toggle_active_mutation(&self.api)
          .execute(products::BotToggle {
            product_id: id,
            active: !off,
          })
          .await?;
      }
      ProductsCommand::Sync => products::fetch_umico_mutation(&self.api).execute(()).await?,
      ProductsCommand::ActivateAll => {
        products::activate_all_mutation(&self.api)
          .execute(())
          .await?;
      }
      ProductsCommand::Activate {
        offer_id,
        old_price,
        retail_price,
        qty,
      } => {
        products::activate_mutation(&self.api)
          .execute(ActivateProduct {
            offer_id,
            old_price,
            retail_price,
            qty,
          })
          .await?;
      }
      ProductsCommand::Deactivate { offer_id } => {
        products::deactivate_mutation(&self.api)
          .execute(DeactivateProduct { offer_id })
          .await?;
      }
    }
    Ok(())
  }

  async fn orders(&self, cmd: OrdersCommand) -> Result<()> {
    self.require_session()?;
    match cmd {
      OrdersCommand::List {
        page,
        page_size,
        search,
        state,
        ordering,
      } => {
        let params = orders::OrderListParams {
          page,
          page_size,
          search,
          state_name: state,
          ordering,
        };
        if let Some(page) = load(orders::list_query(&self.api, params)).await? {
          for o in &page.results {
            println!(
              "{:<14} {:<30} {:<16} {:>10} {}",
              o.umico_order_number, o.customer_full_name, o.state_name, o.total_amount, o.ordered_at
            );
          }
          println!("{} of {}", page.results.len(), page.count);
        }
      }
      OrdersCommand::States => {
        for name in load(orders::state_names_query(&self.api)).await?.unwrap_or_default() {
          println!("{}", name);
        }
      }
      OrdersCommand::Sync => orders::fetch_umico_mutation(&self.api).execute(()).await?,
    }
    Ok(())
  }

  async fn logs(&self, cmd: LogsCommand) -> Result<()> {
    self.require_session()?;
    match cmd {
      LogsCommand::List {
        page,
        page_size,
        search,
      } => {
        let params = logs::LogListParams {
          page,
          page_size,
          search,
        };
        if let Some(page) = load(logs::list_query(&self.api, params)).await? {
          for log in &page.results {
            println!(
              "{} {:<40} {:>10} -> {:>10}",
              log.changed_at, log.product_name, log.old_price, log.new_price
            );
          }
          println!("{} of {}", page.results.len(), page.count);
        }
      }
      LogsCommand::Export { output } => {
        let bytes = logs::export_mutation(&self.api).execute(()).await?;
        std::fs::write(&output, &bytes)
          .map_err(|e| eyre!("Failed to write {}: {}", output.display(), e))?;
        println!("Wrote {} bytes to {}", bytes.len(), output.display());
      }
    }
    Ok(())
  }

  async fn organizations(&self, cmd: OrganizationsCommand) -> Result<()> {
    self.require_session()?;
    match cmd {
      OrganizationsCommand::List { search, city } => {
        let params = OrganizationListParams {
          search,
          city,
          ..Default::default()
        };
        print_json(load(organizations::list_query(&self.api, params)).await?)
      }
      OrganizationsCommand::Mine => print_json(load(organizations::mine_query(&self.api)).await?),
      OrganizationsCommand::Branches { id } => {
        print_json(load(organizations::branches_query(&self.api, id)).await?)
      }
      OrganizationsCommand::Stats => {
        print_json(load(organizations::statistics_query(&self.api)).await?)
      }
    }
  }

  async fn courses(&self, cmd: CoursesCommand) -> Result<()> {
    self.require_session()?;
    match cmd {
      CoursesCommand::List { search, branch } => {
        let params = CourseListParams {
          search,
          branch,
          ..Default::default()
        };
        print_json(load(courses::list_query(&self.api, params)).await?)
      }
      CoursesCommand::Show { id } => print_json(load(courses::detail_query(&self.api, id)).await?),
      CoursesCommand::Groups { id } => print_json(
        load(courses::groups_query(
          &self.api,
          id,
          CourseGroupListParams::default(),
        ))
        .await?,
      ),
      CoursesCommand::MyGroups => print_json(load(courses::my_groups_query(&self.api)).await?),
      CoursesCommand::Upcoming => print_json(
        load(courses::active_upcoming_groups_query(
          &self.api,
          CourseGroupListParams::default(),
        ))
        .await?,
      ),
    }
  }

  async fn groups(&self, cmd: GroupsCommand) -> Result<()> {
    self.require_session()?;
    match cmd {
      GroupsCommand::List { course, status } => {
        let params = CourseGroupListParams {
          course,
          status,
          ..Default::default()
        };
        print_json(load(course_groups::list_query(&self.api, params)).await?)
      }
      GroupsCommand::Show { id } => {
        print_json(load(course_groups::detail_query(&self.api, id)).await?)
      }
      GroupsCommand::Students { id } => {
        print_json(load(course_groups::students_query(&self.api, id)).await?)
      }
      GroupsCommand::Schedule { id } => {
        print_json(load(course_groups::schedule_query(&self.api, id)).await?)
      }
      GroupsCommand::Availability { id } => {
        print_json(load(course_groups::availability_query(&self.api, id)).await?)
      }
    }
  }

  async fn attendance(&self, cmd: AttendanceCommand) -> Result<()> {
    self.require_session()?;
    match cmd {
      AttendanceCommand::List { group, date } => {
        let params = AttendanceListParams {
          course_group: group,
          date,
          ..Default::default()
        };
        print_json(load(attendance::list_query(&self.api, params)).await?)
      }
      AttendanceCommand::Mine => print_json(load(attendance::mine_query(&self.api)).await?),
      AttendanceCommand::Stats { group } => {
        print_json(load(attendance::statistics_query(&self.api, group)).await?)
      }
    }
  }
}

async fn load<T>(mut query: Query<T>) -> Result<Option<T>>
where
  T: Serialize + serde::de::DeserializeOwned + Clone + Send + 'static,
{
  Ok(query.load().await?)
}

fn print_json<T: Serialize>(value: Option<T>) -> Result<()> {
  match value {
    Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
    None => println!("Nothing to show."),
  }
  Ok(())
}
