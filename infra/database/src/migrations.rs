use crate::error::{DatabaseError, DatabaseErrorExt};
use fxhash::FxHashMap;
use rego_domain::constants::Collection;
use strum::IntoEnumIterator;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::types::SurrealValue;

const LEDGER: &str = "DEFINE TABLE IF NOT EXISTS migration SCHEMALESS;
DEFINE INDEX IF NOT EXISTS migration_name ON TABLE migration FIELDS name UNIQUE;";

#[derive(Debug)]
pub(crate) struct Migration {
    pub name: String,
    pub script: String,
    pub checksum: String,
}

impl Migration {
    fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        let script = script.into();
        let checksum = format!("{:016x}", fxhash::hash64(&script));
        Self { name: name.into(), script, checksum }
    }

    fn to_applied(&self) -> AppliedMigration {
        AppliedMigration { name: self.name.clone(), checksum: self.checksum.clone() }
    }
}

/// One table per collection with a unique `key` index and a `status` index.
pub(crate) fn builtin_migrations() -> Vec<Migration> {
    Collection::iter()
        .map(|collection| {
            let table = collection.name();
            Migration::new(
                format!("0001_{table}"),
                format!(
                    "DEFINE TABLE IF NOT EXISTS {table} SCHEMALESS;
                    DEFINE INDEX IF NOT EXISTS {table}_key ON TABLE {table} FIELDS key UNIQUE;
                    DEFINE INDEX IF NOT EXISTS {table}_status ON TABLE {table} FIELDS status;"
                ),
            )
        })
        .collect()
}

#[derive(Debug, Default)]
pub(crate) struct MigrationReport {
    pub applied: Vec<AppliedMigration>,
    pub skipped: Vec<AppliedMigration>,
}

#[derive(Debug, SurrealValue)]
pub(crate) struct AppliedMigration {
    pub name: String,
    pub checksum: String,
}

#[derive(Debug)]
pub(crate) struct MigrationRunner {
    db: Surreal<Any>,
}

impl MigrationRunner {
    #[must_use]
    pub(crate) const fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    pub(crate) async fn run(&self) -> Result<MigrationReport, DatabaseError> {
        self.db
            .query(LEDGER)
            .await
            .context("Defining migration ledger")?
            .check()
            .map_err(surrealdb::Error::from)?;

        let mut report = MigrationReport::default();
        let applied_migrations = self.get_migrations_map().await?;

        for migration in builtin_migrations() {
            if let Some(applied) = applied_migrations.get(&migration.name) {
                ensure_checksum_match(&migration, &applied.checksum)?;
                report.skipped.push(migration.to_applied());
                continue;
            }

            self.apply_migration(&migration).await?;
            report.applied.push(migration.to_applied());
        }

        Ok(report)
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<(), DatabaseError> {
        let query = format!(
            "BEGIN TRANSACTION;
            {}
            CREATE migration CONTENT {{ name: $name, checksum: $checksum }};
            COMMIT TRANSACTION;",
            migration.script,
        );

        self.db
            .query(&query)
            .bind(("name", migration.name.clone()))
            .bind(("checksum", migration.checksum.clone()))
            .await
            .context(format!("SQL execution failed at {}", migration.name))?
            .check()
            .map_err(surrealdb::Error::from)?;

        Ok(())
    }

    async fn get_migrations_map(
        &self,
    ) -> Result<FxHashMap<String, AppliedMigration>, DatabaseError> {
        let entries = self
            .db
            .query("SELECT name, checksum FROM migration")
            .await
            .context("Loading applied migrations")?
            .take::<Vec<AppliedMigration>>(0)
            .context("Parsing migrations map")?;

        Ok(entries.into_iter().map(|entry| (entry.name.clone(), entry)).collect())
    }
}

fn ensure_checksum_match(migration: &Migration, existing: &str) -> Result<(), DatabaseError> {
    if existing != migration.checksum {
        return Err(DatabaseError::Migration {
            message: format!(
                "Checksum mismatch for {} (expected {}, got {})",
                migration.name, existing, migration.checksum
            )
            .into(),
            context: Some("Migration already applied with different checksum".into()),
        });
    }
    Ok(())
}
