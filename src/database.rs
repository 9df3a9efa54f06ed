pub use tokio_postgres::Client;
pub use uuid::Uuid;

use crate::model::{Barrel, Beverage, Pour, PourReport, Temperature, TemperatureReport, Window};
use crate::source::{Changes, Subscription, TransactionSource};

use tokio_postgres::types::Json;

pub struct Database {
    db: Client,
    changes: Changes,
}

impl From<Client> for Database {
    fn from(db: Client) -> Self {
        Self { db, changes: Changes::default() }
    }
}

impl Database {
    /// Records one pour reported by a dispenser and notifies live report
    /// subscribers. The database stamps the pour; the stored form is
    /// returned with its timestamp filled in.
    pub async fn record_pour(&self, pour: PourReport) -> Result<Pour, tokio_postgres::Error> {
        let row = self
            .db
            .query_one(
                "INSERT INTO pour (glass_id, keg, beverage, ounces_poured, ounces_remaining, pour_type, price) \
                VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING created",
                &[
                    &pour.glass_id,
                    &pour.keg,
                    &pour.beverage,
                    &pour.ounces_poured,
                    &pour.ounces_remaining,
                    &pour.pour_type,
                    &pour.price,
                ],
            )
            .await?;
        self.changes.notify();
        Ok(pour.recorded_at(row.get(0)))
    }

    /// Updates a barrel's last reported temperature. Returns `false` if
    /// no such barrel is registered.
    pub async fn record_temperature(&self, report: TemperatureReport) -> Result<bool, tokio_postgres::Error> {
        let row = self
            .db
            .query_opt(
                "UPDATE barrel SET fahrenheit = $2, reported = now() WHERE id = $1 RETURNING id",
                &[&report.barrel, &report.fahrenheit],
            )
            .await?;
        Ok(row.is_some())
    }

    pub async fn beverages(&self) -> Result<Vec<Beverage>, tokio_postgres::Error> {
        let rows =
            self.db.query("SELECT id, name, info, image, tasting_notes FROM beverage ORDER BY name", &[]).await?;
        Ok(rows
            .into_iter()
            .map(|row| Beverage {
                id: Some(row.get(0)),
                name: row.get(1),
                info: row.get(2),
                image: row.get(3),
                tasting_notes: row.get(4),
            })
            .collect())
    }

    /// Inserts the beverage, or updates it in place when it already has
    /// an id. Returns the (possibly fresh) id.
    pub async fn save_beverage(&self, beverage: &Beverage) -> Result<Uuid, tokio_postgres::Error> {
        let row = self
            .db
            .query_one(
                "INSERT INTO beverage (id, name, info, image, tasting_notes) \
                VALUES (coalesce($1, gen_random_uuid()), $2, $3, $4, $5) \
                ON CONFLICT (id) DO UPDATE SET name = $2, info = $3, image = $4, tasting_notes = $5 \
                RETURNING id",
                &[&beverage.id, &beverage.name, &beverage.info, &beverage.image, &beverage.tasting_notes],
            )
            .await?;
        Ok(row.get(0))
    }

    /// Returns whether the beverage existed.
    pub async fn delete_beverage(&self, id: Uuid) -> Result<bool, tokio_postgres::Error> {
        let deleted = self.db.execute("DELETE FROM beverage WHERE id = $1", &[&id]).await?;
        Ok(deleted > 0)
    }

    /// All barrels with their keg configuration. Keg layouts are stored
    /// as one JSON document per barrel, mirroring how the dashboard and
    /// dispensers exchange them.
    pub async fn barrels(&self) -> Result<Vec<Barrel>, tokio_postgres::Error> {
        let rows = self.db.query("SELECT id, name, fahrenheit, reported, kegs FROM barrel ORDER BY name", &[]).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let fahrenheit: Option<f64> = row.get(2);
                let reported: Option<chrono::DateTime<chrono::Utc>> = row.get(3);
                let Json(kegs) = row.get(4);
                Barrel {
                    id: Some(row.get(0)),
                    name: row.get(1),
                    temperature: fahrenheit
                        .zip(reported)
                        .map(|(fahrenheit, timestamp)| Temperature { fahrenheit, timestamp }),
                    kegs,
                }
            })
            .collect())
    }

    /// Inserts or updates a barrel and its keg configuration. Reported
    /// temperatures are left alone; only the sensor endpoint sets those.
    pub async fn save_barrel(&self, barrel: &Barrel) -> Result<Uuid, tokio_postgres::Error> {
        let row = self
            .db
            .query_one(
                "INSERT INTO barrel (id, name, kegs) VALUES (coalesce($1, gen_random_uuid()), $2, $3) \
                ON CONFLICT (id) DO UPDATE SET name = $2, kegs = $3 RETURNING id",
                &[&barrel.id, &barrel.name, &Json(&barrel.kegs)],
            )
            .await?;
        Ok(row.get(0))
    }

    /// Returns whether the barrel existed.
    pub async fn delete_barrel(&self, id: Uuid) -> Result<bool, tokio_postgres::Error> {
        let deleted = self.db.execute("DELETE FROM barrel WHERE id = $1", &[&id]).await?;
        Ok(deleted > 0)
    }
}

impl TransactionSource for Database {
    async fn in_window(&self, window: Window) -> anyhow::Result<Vec<Pour>> {
        let hours = i32::try_from(window.hours())?;
        let rows = self
            .db
            .query(
                "SELECT glass_id, keg, beverage, ounces_poured, ounces_remaining, pour_type, price, created \
                FROM pour WHERE created >= now() - make_interval(hours => $1) ORDER BY created DESC",
                &[&hours],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| Pour {
                glass_id: row.get(0),
                keg: row.get(1),
                beverage: row.get(2),
                ounces_poured: row.get(3),
                ounces_remaining: row.get(4),
                pour_type: row.get(5),
                price: row.get(6),
                created: row.get(7),
            })
            .collect())
    }

    fn watch(&self) -> Subscription {
        self.changes.subscribe()
    }
}
