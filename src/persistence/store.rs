//! `SQLite`-backed store for organizations, categories, and pull requests.
//!
//! The categorization pipeline is a narrow consumer of the dashboard's
//! relational store: it reads pull request content and organization
//! configuration, and writes back the categorization status lifecycle. The
//! [`CategorizationStore`] trait captures exactly that contract so the
//! orchestrator can be exercised against a mock.

use diesel::Connection;
use diesel::OptionalExtension;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Bool, Double, Nullable, Text};
use diesel::sqlite::SqliteConnection;

use super::PersistenceError;

const PULL_REQUESTS_TABLE: &str = "pull_requests";

/// Categorization lifecycle state stored on a pull request row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiStatus {
    /// No categorization attempt has been made.
    None,
    /// A categorization run is in flight.
    Processing,
    /// A category and confidence have been assigned.
    Completed,
    /// The last attempt terminated with an error.
    Error,
}

impl AiStatus {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    fn parse(value: &str) -> Result<Self, PersistenceError> {
        match value {
            "none" => Ok(Self::None),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            other => Err(PersistenceError::InvalidRow {
                message: format!("unknown ai_status value: {other}"),
            }),
        }
    }
}

/// A pull request row as the pipeline sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequestRecord {
    /// Row identifier.
    pub id: i64,
    /// Owning repository.
    pub repository_id: i64,
    /// Pull request number on GitHub.
    pub number: i64,
    /// Title.
    pub title: String,
    /// Body text, when present.
    pub description: Option<String>,
    /// Categorization lifecycle state.
    pub ai_status: AiStatus,
    /// Assigned category; set only when `ai_status` is `Completed`.
    pub category_id: Option<i64>,
    /// Model confidence; set only when `ai_status` is `Completed`.
    pub confidence: Option<f64>,
    /// Failure detail; set only when `ai_status` is `Error`.
    pub error_message: Option<String>,
}

/// A repository row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRecord {
    /// Row identifier.
    pub id: i64,
    /// Owning organization.
    pub organization_id: i64,
    /// GitHub full name in `owner/repo` form.
    pub full_name: String,
}

/// An organization row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationRecord {
    /// Row identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// GitHub App installation, when the App is installed.
    pub installation_id: Option<i64>,
}

/// An organization's AI provider configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AiSettings {
    /// Provider tag (`openai`, `google`, `anthropic`).
    pub provider: Option<String>,
    /// Provider-specific model identifier.
    pub model: Option<String>,
    /// API key presented to the provider.
    pub api_key: Option<String>,
}

/// A category row. Immutable during a categorization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    /// Row identifier.
    pub id: i64,
    /// Owning organization; `None` marks a system-wide default category.
    pub organization_id: Option<i64>,
    /// Display name the model is asked to reproduce verbatim.
    pub name: String,
    /// Human description.
    pub description: String,
    /// Display colour.
    pub color: String,
    /// Whether this is a system-provided default.
    pub is_default: bool,
}

/// The persistence contract consumed by the categorization pipeline.
#[cfg_attr(test, mockall::automock)]
pub trait CategorizationStore: Send + Sync {
    /// Loads a pull request by id.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    fn find_pull_request(&self, id: i64) -> Result<Option<PullRequestRecord>, PersistenceError>;

    /// Loads a repository by id.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    fn find_repository(&self, id: i64) -> Result<Option<RepositoryRecord>, PersistenceError>;

    /// Loads an organization by id.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    fn find_organization(&self, id: i64) -> Result<Option<OrganizationRecord>, PersistenceError>;

    /// Loads the organization's AI provider settings.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    fn ai_settings_for_organization(
        &self,
        organization_id: i64,
    ) -> Result<AiSettings, PersistenceError>;

    /// Loads the categories visible to the organization in canonical order:
    /// organization-defined categories first (id order), then system-wide
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    fn categories_for_organization(
        &self,
        organization_id: i64,
    ) -> Result<Vec<CategoryRecord>, PersistenceError>;

    /// Marks a categorization run as started, clearing any previous outcome.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the write fails or matches no row.
    fn set_processing(&self, pull_request_id: i64) -> Result<(), PersistenceError>;

    /// Records a terminal failure for the run.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the write fails or matches no row.
    fn set_error(&self, pull_request_id: i64, message: &str) -> Result<(), PersistenceError>;

    /// Records a successful categorization.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the write fails or matches no row.
    fn set_completed(
        &self,
        pull_request_id: i64,
        category_id: i64,
        confidence: f64,
    ) -> Result<(), PersistenceError>;
}

/// `SQLite` implementation of [`CategorizationStore`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    database_url: String,
}

impl SqliteStore {
    /// Create a store targeting the configured `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::BlankDatabaseUrl`] when the URL is blank.
    pub fn new(database_url: impl Into<String>) -> Result<Self, PersistenceError> {
        let database_url_string = database_url.into();
        if database_url_string.trim().is_empty() {
            return Err(PersistenceError::BlankDatabaseUrl);
        }
        Ok(Self {
            database_url: database_url_string,
        })
    }

    pub(crate) fn establish_connection(&self) -> Result<SqliteConnection, PersistenceError> {
        let mut connection = SqliteConnection::establish(&self.database_url).map_err(|error| {
            PersistenceError::ConnectionFailed {
                message: error.to_string(),
            }
        })?;

        sql_query("PRAGMA foreign_keys = ON;")
            .execute(&mut connection)
            .map(drop)
            .map_err(|error| PersistenceError::ForeignKeysEnableFailed {
                message: error.to_string(),
            })?;

        Ok(connection)
    }

    fn schema_table_exists(
        connection: &mut SqliteConnection,
    ) -> Result<bool, diesel::result::Error> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            one: i64,
        }

        let exists: Option<Row> = sql_query(
            "SELECT 1 AS one FROM sqlite_master WHERE type = 'table' AND name = ? LIMIT 1;",
        )
        .bind::<Text, _>(PULL_REQUESTS_TABLE)
        .get_result(connection)
        .optional()?;

        let _ = exists.as_ref().map(|row| row.one);
        Ok(exists.is_some())
    }

    fn map_error_with_schema_check<F>(
        connection: &mut SqliteConnection,
        error: &diesel::result::Error,
        create_error: F,
    ) -> PersistenceError
    where
        F: Fn(String) -> PersistenceError,
    {
        match Self::schema_table_exists(connection) {
            Ok(false) => PersistenceError::SchemaNotInitialised,
            Ok(true) => create_error(error.to_string()),
            Err(check_error) => create_error(format!(
                "schema presence check failed: {check_error}; original error: {error}"
            )),
        }
    }

    fn map_query_error(
        connection: &mut SqliteConnection,
        error: &diesel::result::Error,
    ) -> PersistenceError {
        Self::map_error_with_schema_check(connection, error, |message| {
            PersistenceError::QueryFailed { message }
        })
    }

    fn map_write_error(
        connection: &mut SqliteConnection,
        error: &diesel::result::Error,
    ) -> PersistenceError {
        Self::map_error_with_schema_check(connection, error, |message| {
            PersistenceError::WriteFailed { message }
        })
    }

    fn ensure_one_row(affected: usize) -> Result<(), PersistenceError> {
        if affected == 0 {
            return Err(PersistenceError::WriteFailed {
                message: "expected to update 1 pull request row but updated 0".to_owned(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, QueryableByName)]
struct PullRequestRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
    #[diesel(sql_type = BigInt)]
    repository_id: i64,
    #[diesel(sql_type = BigInt)]
    number: i64,
    #[diesel(sql_type = Text)]
    title: String,
    #[diesel(sql_type = Nullable<Text>)]
    description: Option<String>,
    #[diesel(sql_type = Text)]
    ai_status: String,
    #[diesel(sql_type = Nullable<BigInt>)]
    category_id: Option<i64>,
    #[diesel(sql_type = Nullable<Double>)]
    confidence: Option<f64>,
    #[diesel(sql_type = Nullable<Text>)]
    error_message: Option<String>,
}

impl TryFrom<PullRequestRow> for PullRequestRecord {
    type Error = PersistenceError;

    fn try_from(row: PullRequestRow) -> Result<Self, PersistenceError> {
        Ok(Self {
            id: row.id,
            repository_id: row.repository_id,
            number: row.number,
            title: row.title,
            description: row.description,
            ai_status: AiStatus::parse(&row.ai_status)?,
            category_id: row.category_id,
            confidence: row.confidence,
            error_message: row.error_message,
        })
    }
}

#[derive(Debug, QueryableByName)]
struct CategoryRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
    #[diesel(sql_type = Nullable<BigInt>)]
    organization_id: Option<i64>,
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Text)]
    description: String,
    #[diesel(sql_type = Text)]
    color: String,
    #[diesel(sql_type = Bool)]
    is_default: bool,
}

impl From<CategoryRow> for CategoryRecord {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
            description: row.description,
            color: row.color,
            is_default: row.is_default,
        }
    }
}

impl CategorizationStore for SqliteStore {
    fn find_pull_request(&self, id: i64) -> Result<Option<PullRequestRecord>, PersistenceError> {
        let mut connection = self.establish_connection()?;

        let row: Option<PullRequestRow> = sql_query(
            "SELECT id, repository_id, number, title, description, ai_status, category_id, \
             confidence, error_message \
             FROM pull_requests WHERE id = ? LIMIT 1;",
        )
        .bind::<BigInt, _>(id)
        .get_result(&mut connection)
        .optional()
        .map_err(|error| Self::map_query_error(&mut connection, &error))?;

        row.map(PullRequestRecord::try_from).transpose()
    }

    fn find_repository(&self, id: i64) -> Result<Option<RepositoryRecord>, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            id: i64,
            #[diesel(sql_type = BigInt)]
            organization_id: i64,
            #[diesel(sql_type = Text)]
            full_name: String,
        }

        let mut connection = self.establish_connection()?;

        let row: Option<Row> = sql_query(
            "SELECT id, organization_id, full_name FROM repositories WHERE id = ? LIMIT 1;",
        )
        .bind::<BigInt, _>(id)
        .get_result(&mut connection)
        .optional()
        .map_err(|error| Self::map_query_error(&mut connection, &error))?;

        Ok(row.map(|found| RepositoryRecord {
            id: found.id,
            organization_id: found.organization_id,
            full_name: found.full_name,
        }))
    }

    fn find_organization(&self, id: i64) -> Result<Option<OrganizationRecord>, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            id: i64,
            #[diesel(sql_type = Text)]
            name: String,
            #[diesel(sql_type = Nullable<BigInt>)]
            installation_id: Option<i64>,
        }

        let mut connection = self.establish_connection()?;

        let row: Option<Row> = sql_query(
            "SELECT id, name, installation_id FROM organizations WHERE id = ? LIMIT 1;",
        )
        .bind::<BigInt, _>(id)
        .get_result(&mut connection)
        .optional()
        .map_err(|error| Self::map_query_error(&mut connection, &error))?;

        Ok(row.map(|found| OrganizationRecord {
            id: found.id,
            name: found.name,
            installation_id: found.installation_id,
        }))
    }

    fn ai_settings_for_organization(
        &self,
        organization_id: i64,
    ) -> Result<AiSettings, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = Nullable<Text>)]
            ai_provider: Option<String>,
            #[diesel(sql_type = Nullable<Text>)]
            ai_model: Option<String>,
            #[diesel(sql_type = Nullable<Text>)]
            ai_api_key: Option<String>,
        }

        let mut connection = self.establish_connection()?;

        let row: Option<Row> = sql_query(
            "SELECT ai_provider, ai_model, ai_api_key FROM organizations WHERE id = ? LIMIT 1;",
        )
        .bind::<BigInt, _>(organization_id)
        .get_result(&mut connection)
        .optional()
        .map_err(|error| Self::map_query_error(&mut connection, &error))?;

        Ok(row.map_or_else(AiSettings::default, |found| AiSettings {
            provider: found.ai_provider,
            model: found.ai_model,
            api_key: found.ai_api_key,
        }))
    }

    fn categories_for_organization(
        &self,
        organization_id: i64,
    ) -> Result<Vec<CategoryRecord>, PersistenceError> {
        let mut connection = self.establish_connection()?;

        let rows: Vec<CategoryRow> = sql_query(
            "SELECT id, organization_id, name, description, color, is_default \
             FROM categories \
             WHERE organization_id = ? OR organization_id IS NULL \
             ORDER BY (organization_id IS NULL) ASC, id ASC;",
        )
        .bind::<BigInt, _>(organization_id)
        .get_results(&mut connection)
        .map_err(|error| Self::map_query_error(&mut connection, &error))?;

        Ok(rows.into_iter().map(CategoryRecord::from).collect())
    }

    fn set_processing(&self, pull_request_id: i64) -> Result<(), PersistenceError> {
        let mut connection = self.establish_connection()?;

        let affected = sql_query(
            "UPDATE pull_requests \
             SET ai_status = 'processing', category_id = NULL, confidence = NULL, \
                 error_message = NULL, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?;",
        )
        .bind::<BigInt, _>(pull_request_id)
        .execute(&mut connection)
        .map_err(|error| Self::map_write_error(&mut connection, &error))?;

        Self::ensure_one_row(affected)
    }

    fn set_error(&self, pull_request_id: i64, message: &str) -> Result<(), PersistenceError> {
        let mut connection = self.establish_connection()?;

        let affected = sql_query(
            "UPDATE pull_requests \
             SET ai_status = 'error', category_id = NULL, confidence = NULL, \
                 error_message = ?, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?;",
        )
        .bind::<Text, _>(message.to_owned())
        .bind::<BigInt, _>(pull_request_id)
        .execute(&mut connection)
        .map_err(|error| Self::map_write_error(&mut connection, &error))?;

        Self::ensure_one_row(affected)
    }

    fn set_completed(
        &self,
        pull_request_id: i64,
        category_id: i64,
        confidence: f64,
    ) -> Result<(), PersistenceError> {
        let mut connection = self.establish_connection()?;

        let affected = sql_query(
            "UPDATE pull_requests \
             SET ai_status = 'completed', category_id = ?, confidence = ?, \
                 error_message = NULL, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?;",
        )
        .bind::<BigInt, _>(category_id)
        .bind::<Double, _>(confidence)
        .bind::<BigInt, _>(pull_request_id)
        .execute(&mut connection)
        .map_err(|error| Self::map_write_error(&mut connection, &error))?;

        Self::ensure_one_row(affected)
    }
}

/// Seeding helpers used by unit and integration tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use diesel::RunQueryDsl;
    use diesel::sql_query;
    use diesel::sql_types::{BigInt, Bool, Nullable, Text};
    use diesel::sqlite::SqliteConnection;

    use super::{PersistenceError, SqliteStore};

    #[derive(Debug, diesel::QueryableByName)]
    struct RowId {
        #[diesel(sql_type = BigInt)]
        id: i64,
    }

    fn last_insert_rowid(connection: &mut SqliteConnection) -> Result<i64, PersistenceError> {
        sql_query("SELECT last_insert_rowid() AS id;")
            .get_result::<RowId>(connection)
            .map(|row| row.id)
            .map_err(|error| PersistenceError::QueryFailed {
                message: error.to_string(),
            })
    }

    /// Organization seed data.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SeedOrganization<'a> {
        /// Display name.
        pub name: &'a str,
        /// GitHub App installation id.
        pub installation_id: Option<i64>,
        /// Provider tag.
        pub ai_provider: Option<&'a str>,
        /// Model identifier.
        pub ai_model: Option<&'a str>,
        /// Provider API key.
        pub ai_api_key: Option<&'a str>,
    }

    impl SqliteStore {
        /// Inserts an organization row and returns its id.
        ///
        /// # Errors
        ///
        /// Returns [`PersistenceError`] when the insert fails.
        pub fn insert_organization(
            &self,
            seed: SeedOrganization<'_>,
        ) -> Result<i64, PersistenceError> {
            let mut connection = self.establish_connection()?;

            sql_query(
                "INSERT INTO organizations (name, installation_id, ai_provider, ai_model, \
                 ai_api_key) VALUES (?, ?, ?, ?, ?);",
            )
            .bind::<Text, _>(seed.name)
            .bind::<Nullable<BigInt>, _>(seed.installation_id)
            .bind::<Nullable<Text>, _>(seed.ai_provider)
            .bind::<Nullable<Text>, _>(seed.ai_model)
            .bind::<Nullable<Text>, _>(seed.ai_api_key)
            .execute(&mut connection)
            .map_err(|error| PersistenceError::WriteFailed {
                message: error.to_string(),
            })?;

            last_insert_rowid(&mut connection)
        }

        /// Inserts a repository row and returns its id.
        ///
        /// # Errors
        ///
        /// Returns [`PersistenceError`] when the insert fails.
        pub fn insert_repository(
            &self,
            organization_id: i64,
            full_name: &str,
        ) -> Result<i64, PersistenceError> {
            let mut connection = self.establish_connection()?;

            sql_query("INSERT INTO repositories (organization_id, full_name) VALUES (?, ?);")
                .bind::<BigInt, _>(organization_id)
                .bind::<Text, _>(full_name)
                .execute(&mut connection)
                .map_err(|error| PersistenceError::WriteFailed {
                    message: error.to_string(),
                })?;

            last_insert_rowid(&mut connection)
        }

        /// Inserts a category row and returns its id.
        ///
        /// # Errors
        ///
        /// Returns [`PersistenceError`] when the insert fails.
        pub fn insert_category(
            &self,
            organization_id: Option<i64>,
            name: &str,
            is_default: bool,
        ) -> Result<i64, PersistenceError> {
            let mut connection = self.establish_connection()?;

            sql_query(
                "INSERT INTO categories (organization_id, name, is_default) VALUES (?, ?, ?);",
            )
            .bind::<Nullable<BigInt>, _>(organization_id)
            .bind::<Text, _>(name)
            .bind::<Bool, _>(is_default)
            .execute(&mut connection)
            .map_err(|error| PersistenceError::WriteFailed {
                message: error.to_string(),
            })?;

            last_insert_rowid(&mut connection)
        }

        /// Inserts a pull request row and returns its id.
        ///
        /// # Errors
        ///
        /// Returns [`PersistenceError`] when the insert fails.
        pub fn insert_pull_request(
            &self,
            repository_id: i64,
            number: i64,
            title: &str,
            description: Option<&str>,
        ) -> Result<i64, PersistenceError> {
            let mut connection = self.establish_connection()?;

            sql_query(
                "INSERT INTO pull_requests (repository_id, number, title, description) \
                 VALUES (?, ?, ?, ?);",
            )
            .bind::<BigInt, _>(repository_id)
            .bind::<BigInt, _>(number)
            .bind::<Text, _>(title)
            .bind::<Nullable<Text>, _>(description)
            .execute(&mut connection)
            .map_err(|error| PersistenceError::WriteFailed {
                message: error.to_string(),
            })?;

            last_insert_rowid(&mut connection)
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::test_support::SeedOrganization;
    use super::{AiStatus, CategorizationStore, PersistenceError, SqliteStore};
    use crate::persistence::migrate_database;
    use crate::telemetry::NoopTelemetrySink;

    #[fixture]
    fn migrated_store() -> (TempDir, SqliteStore) {
        let temp_dir =
            TempDir::new().unwrap_or_else(|error| panic!("temp dir should be created: {error}"));
        let db_path = temp_dir.path().join("pigeonhole.sqlite");
        let database_url = db_path.to_string_lossy().to_string();

        migrate_database(&database_url, &NoopTelemetrySink)
            .unwrap_or_else(|error| panic!("migrations should run: {error}"));

        let store = SqliteStore::new(database_url)
            .unwrap_or_else(|error| panic!("store should build: {error}"));
        (temp_dir, store)
    }

    fn seed_pull_request(store: &SqliteStore) -> i64 {
        let organization_id = store
            .insert_organization(SeedOrganization {
                name: "acme",
                installation_id: Some(77),
                ai_provider: Some("openai"),
                ai_model: Some("model-x"),
                ai_api_key: Some("key-x"),
            })
            .unwrap_or_else(|error| panic!("organization should insert: {error}"));
        let repository_id = store
            .insert_repository(organization_id, "acme/widgets")
            .unwrap_or_else(|error| panic!("repository should insert: {error}"));
        store
            .insert_pull_request(repository_id, 5, "Fix crash", Some("Body text"))
            .unwrap_or_else(|error| panic!("pull request should insert: {error}"))
    }

    #[rstest]
    fn new_pull_requests_start_without_categorization(migrated_store: (TempDir, SqliteStore)) {
        let (_temp_dir, store) = migrated_store;
        let pull_request_id = seed_pull_request(&store);

        let record = store
            .find_pull_request(pull_request_id)
            .unwrap_or_else(|error| panic!("lookup should succeed: {error}"))
            .unwrap_or_else(|| panic!("row should exist"));

        assert_eq!(record.ai_status, AiStatus::None);
        assert_eq!(record.title, "Fix crash");
        assert_eq!(record.description.as_deref(), Some("Body text"));
        assert!(record.category_id.is_none(), "no category yet");
        assert!(record.confidence.is_none(), "no confidence yet");
        assert!(record.error_message.is_none(), "no error yet");
    }

    #[rstest]
    fn processing_clears_previous_outcome(migrated_store: (TempDir, SqliteStore)) {
        let (_temp_dir, store) = migrated_store;
        let pull_request_id = seed_pull_request(&store);

        store
            .set_error(pull_request_id, "previous failure")
            .unwrap_or_else(|error| panic!("set_error should succeed: {error}"));
        store
            .set_processing(pull_request_id)
            .unwrap_or_else(|error| panic!("set_processing should succeed: {error}"));

        let record = store
            .find_pull_request(pull_request_id)
            .unwrap_or_else(|error| panic!("lookup should succeed: {error}"))
            .unwrap_or_else(|| panic!("row should exist"));

        assert_eq!(record.ai_status, AiStatus::Processing);
        assert!(
            record.error_message.is_none(),
            "a fresh attempt must clear the previous error"
        );
    }

    #[rstest]
    fn completed_rows_carry_category_and_confidence(migrated_store: (TempDir, SqliteStore)) {
        let (_temp_dir, store) = migrated_store;
        let pull_request_id = seed_pull_request(&store);
        let category_id = store
            .insert_category(Some(1), "Bug Fix", false)
            .unwrap_or_else(|error| panic!("category should insert: {error}"));

        store
            .set_processing(pull_request_id)
            .unwrap_or_else(|error| panic!("set_processing should succeed: {error}"));
        store
            .set_completed(pull_request_id, category_id, 0.95)
            .unwrap_or_else(|error| panic!("set_completed should succeed: {error}"));

        let record = store
            .find_pull_request(pull_request_id)
            .unwrap_or_else(|error| panic!("lookup should succeed: {error}"))
            .unwrap_or_else(|| panic!("row should exist"));

        assert_eq!(record.ai_status, AiStatus::Completed);
        assert_eq!(record.category_id, Some(category_id));
        assert_eq!(record.confidence, Some(0.95));
        assert!(record.error_message.is_none(), "completed rows carry no error");
    }

    #[rstest]
    fn error_rows_carry_only_the_message(migrated_store: (TempDir, SqliteStore)) {
        let (_temp_dir, store) = migrated_store;
        let pull_request_id = seed_pull_request(&store);

        store
            .set_processing(pull_request_id)
            .unwrap_or_else(|error| panic!("set_processing should succeed: {error}"));
        store
            .set_error(pull_request_id, "Could not parse AI category response")
            .unwrap_or_else(|error| panic!("set_error should succeed: {error}"));

        let record = store
            .find_pull_request(pull_request_id)
            .unwrap_or_else(|error| panic!("lookup should succeed: {error}"))
            .unwrap_or_else(|| panic!("row should exist"));

        assert_eq!(record.ai_status, AiStatus::Error);
        assert_eq!(
            record.error_message.as_deref(),
            Some("Could not parse AI category response")
        );
        assert!(record.category_id.is_none(), "error rows carry no category");
        assert!(record.confidence.is_none(), "error rows carry no confidence");
    }

    #[rstest]
    fn categories_list_organization_entries_before_defaults(
        migrated_store: (TempDir, SqliteStore),
    ) {
        let (_temp_dir, store) = migrated_store;
        let organization_id = store
            .insert_organization(SeedOrganization {
                name: "acme",
                ..SeedOrganization::default()
            })
            .unwrap_or_else(|error| panic!("organization should insert: {error}"));

        let default_id = store
            .insert_category(None, "Other", true)
            .unwrap_or_else(|error| panic!("default category should insert: {error}"));
        let first_id = store
            .insert_category(Some(organization_id), "Bug Fix", false)
            .unwrap_or_else(|error| panic!("category should insert: {error}"));
        let second_id = store
            .insert_category(Some(organization_id), "Feature", false)
            .unwrap_or_else(|error| panic!("category should insert: {error}"));

        let categories = store
            .categories_for_organization(organization_id)
            .unwrap_or_else(|error| panic!("listing should succeed: {error}"));

        let ids: Vec<i64> = categories.iter().map(|category| category.id).collect();
        assert_eq!(
            ids,
            vec![first_id, second_id, default_id],
            "organization categories should precede system defaults"
        );
    }

    #[rstest]
    fn categories_exclude_other_organizations(migrated_store: (TempDir, SqliteStore)) {
        let (_temp_dir, store) = migrated_store;
        let ours = store
            .insert_organization(SeedOrganization {
                name: "ours",
                ..SeedOrganization::default()
            })
            .unwrap_or_else(|error| panic!("organization should insert: {error}"));
        let theirs = store
            .insert_organization(SeedOrganization {
                name: "theirs",
                ..SeedOrganization::default()
            })
            .unwrap_or_else(|error| panic!("organization should insert: {error}"));

        store
            .insert_category(Some(theirs), "Their Category", false)
            .unwrap_or_else(|error| panic!("category should insert: {error}"));

        let categories = store
            .categories_for_organization(ours)
            .unwrap_or_else(|error| panic!("listing should succeed: {error}"));

        assert!(
            categories.is_empty(),
            "another organization's categories must not leak"
        );
    }

    #[rstest]
    fn ai_settings_round_trip(migrated_store: (TempDir, SqliteStore)) {
        let (_temp_dir, store) = migrated_store;
        let organization_id = store
            .insert_organization(SeedOrganization {
                name: "acme",
                installation_id: Some(77),
                ai_provider: Some("anthropic"),
                ai_model: Some("model-y"),
                ai_api_key: Some("key-y"),
            })
            .unwrap_or_else(|error| panic!("organization should insert: {error}"));

        let settings = store
            .ai_settings_for_organization(organization_id)
            .unwrap_or_else(|error| panic!("settings lookup should succeed: {error}"));

        assert_eq!(settings.provider.as_deref(), Some("anthropic"));
        assert_eq!(settings.model.as_deref(), Some("model-y"));
        assert_eq!(settings.api_key.as_deref(), Some("key-y"));
    }

    #[rstest]
    fn updates_against_missing_rows_fail(migrated_store: (TempDir, SqliteStore)) {
        let (_temp_dir, store) = migrated_store;

        let error = store
            .set_processing(9999)
            .expect_err("update without a row should fail");

        assert!(
            matches!(error, PersistenceError::WriteFailed { .. }),
            "expected WriteFailed, got {error:?}"
        );
    }

    #[rstest]
    fn unmigrated_database_reports_missing_schema() {
        let temp_dir =
            TempDir::new().unwrap_or_else(|error| panic!("temp dir should be created: {error}"));
        let db_path = temp_dir.path().join("empty.sqlite");
        let store = SqliteStore::new(db_path.to_string_lossy().to_string())
            .unwrap_or_else(|error| panic!("store should build: {error}"));

        let error = store
            .find_pull_request(1)
            .expect_err("unmigrated database should fail");

        assert_eq!(error, PersistenceError::SchemaNotInitialised);
    }
}
