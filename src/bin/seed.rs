use appointly::{
    domain::{
        CreateAddonRequest, CreateAvailabilityRequest, CreateServiceRequest, DayOfWeek,
        UpsertProviderProfileRequest, VerificationStatus,
    },
    repository::{
        AvailabilityRepository, CatalogRepository, ProviderRepository,
        SqliteAvailabilityRepository, SqliteCatalogRepository, SqliteProviderRepository,
    },
};
use chrono::NaiveTime;
use clap::Parser;
use fake::{faker::company::en::CompanyName, Fake};
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

/// Populate a database with demo providers, services and weekly hours.
#[derive(Debug, Parser)]
struct Args {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://appointly.db?mode=rwc")]
    database_url: String,

    /// Number of approved providers to create
    #[arg(long, default_value_t = 3)]
    providers: usize,

    /// Also create one provider still awaiting verification
    #[arg(long)]
    with_pending: bool,
}

const SERVICES: &[(&str, i64, i32)] = &[
    ("Deep Cleaning", 12000, 120),
    ("Standard Cleaning", 6000, 60),
    ("Window Washing", 4500, 30),
];

const ADDONS: &[(&str, i64)] = &[
    ("Inside Fridge", 1500),
    ("Inside Oven", 2000),
    ("Balcony", 1000),
];

const WORKDAYS: [DayOfWeek; 5] = [
    DayOfWeek::Monday,
    DayOfWeek::Tuesday,
    DayOfWeek::Wednesday,
    DayOfWeek::Thursday,
    DayOfWeek::Friday,
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    println!("🌱 Starting database seeding...");

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    // Run migrations first
    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let provider_repo = SqliteProviderRepository::new(db_pool.clone());
    let catalog_repo = SqliteCatalogRepository::new(db_pool.clone());
    let availability_repo = SqliteAvailabilityRepository::new(db_pool.clone());

    let open = NaiveTime::from_hms_opt(9, 0, 0).ok_or_else(|| anyhow::anyhow!("invalid opening time"))?;
    let close = NaiveTime::from_hms_opt(17, 0, 0).ok_or_else(|| anyhow::anyhow!("invalid closing time"))?;

    println!("🧹 Creating providers...");
    for i in 0..args.providers {
        let provider_id = Uuid::new_v4();
        let business_name: String = CompanyName().fake();

        // Every other provider negotiates a lower rate
        let commission_rate = (i % 2 == 1).then(|| Decimal::new(1000, 2));

        provider_repo
            .upsert_profile(UpsertProviderProfileRequest {
                provider_id,
                business_name: business_name.clone(),
                verification_status: VerificationStatus::Approved,
                commission_rate,
            })
            .await?;

        for (name, price_cents, duration) in SERVICES {
            let service = catalog_repo
                .create_service(CreateServiceRequest {
                    provider_id,
                    name: name.to_string(),
                    base_price: Decimal::new(*price_cents, 2),
                    duration_minutes: Some(*duration),
                })
                .await?;

            for (addon_name, addon_cents) in ADDONS {
                catalog_repo
                    .create_addon(CreateAddonRequest {
                        service_id: service.id,
                        name: addon_name.to_string(),
                        price: Decimal::new(*addon_cents, 2),
                    })
                    .await?;
            }
        }

        for day in WORKDAYS {
            availability_repo
                .create_window(
                    provider_id,
                    CreateAvailabilityRequest {
                        day_of_week: day,
                        start_time: open,
                        end_time: close,
                        is_available: true,
                    },
                )
                .await?;
        }

        println!("  ✅ {} ({})", business_name, provider_id);
    }

    if args.with_pending {
        let provider_id = Uuid::new_v4();
        let business_name: String = CompanyName().fake();
        provider_repo
            .upsert_profile(UpsertProviderProfileRequest {
                provider_id,
                business_name: business_name.clone(),
                verification_status: VerificationStatus::Pending,
                commission_rate: None,
            })
            .await?;
        println!("  ⏳ {} ({}) awaiting verification", business_name, provider_id);
    }

    println!("\n✨ Database seeding complete!");
    println!("  Providers work Monday to Friday, 09:00 to 17:00.");

    Ok(())
}
