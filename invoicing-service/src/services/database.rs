//! MongoDB store for invoicing-service.

use super::metrics::DB_QUERY_DURATION;
use super::repository::{
    CounterRepository, EmailLogRepository, InsertOutcome, InvoiceRepository, LedgerRepository,
    ProfileRepository, StoreHealth,
};
use crate::models::{
    CompanyProfile, EmailLog, IncomeEntry, Invoice, InvoiceFilter, StatusChange, Transition,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::{
        FindOneAndUpdateOptions, FindOptions, IndexOptions, ReplaceOptions, ReturnDocument,
    },
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;
use tracing::{info, instrument};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoStore {
    client: MongoClient,
    db: Database,
}

fn db_error(context: &'static str) -> impl Fn(mongodb::error::Error) -> AppError {
    move |e| {
        tracing::error!("{}: {}", context, e);
        AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, e))
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write_error))
            if write_error.code == DUPLICATE_KEY
    )
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    /// Handle to the underlying database, for test teardown.
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        info!("Creating MongoDB indexes for invoicing-service");

        let invoice_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "invoice_id": 1 })
                .options(
                    IndexOptions::builder()
                        .name("invoice_id_idx".to_string())
                        .unique(true)
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "invoice_number": 1 })
                .options(
                    IndexOptions::builder()
                        .name("user_invoice_number_idx".to_string())
                        .unique(true)
                        .build(),
                )
                .build(),
            // Listing: newest first per user
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "created_at": -1 })
                .options(
                    IndexOptions::builder()
                        .name("user_created_at_idx".to_string())
                        .build(),
                )
                .build(),
        ];
        self.invoices()
            .create_indexes(invoice_indexes, None)
            .await
            .map_err(db_error("Failed to create invoice indexes"))?;

        // At most one settlement entry per invoice; manual entries carry no
        // reference and are left out of the index.
        let ledger_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "invoice_reference": 1 })
                .options(
                    IndexOptions::builder()
                        .name("user_invoice_reference_idx".to_string())
                        .unique(true)
                        .partial_filter_expression(
                            doc! { "invoice_reference": { "$exists": true } },
                        )
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "date": -1 })
                .options(
                    IndexOptions::builder()
                        .name("user_date_idx".to_string())
                        .build(),
                )
                .build(),
        ];
        self.income_entries()
            .create_indexes(ledger_indexes, None)
            .await
            .map_err(db_error("Failed to create income entry indexes"))?;

        let email_log_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "invoice_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_invoice_idx".to_string())
                    .build(),
            )
            .build();
        self.email_logs()
            .create_index(email_log_index, None)
            .await
            .map_err(db_error("Failed to create email log index"))?;

        info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    fn invoices(&self) -> Collection<Invoice> {
        self.db.collection("invoices")
    }

    fn income_entries(&self) -> Collection<IncomeEntry> {
        self.db.collection("income_entries")
    }

    fn company_profiles(&self) -> Collection<CompanyProfile> {
        self.db.collection("company_profiles")
    }

    fn counters(&self) -> Collection<Document> {
        self.db.collection("counters")
    }

    fn email_logs(&self) -> Collection<EmailLog> {
        self.db.collection("email_logs")
    }
}

/// `$set` document for a lifecycle transition.
fn status_update(change: &StatusChange) -> Result<Document, AppError> {
    let at = bson::to_bson(&change.at)?;
    let mut set = doc! {
        "status": change.transition.target().as_str(),
        "updated_at": at.clone(),
    };
    match change.transition {
        Transition::Send => {
            set.insert("sent_at", at);
            if let Some(link) = &change.payment_link {
                set.insert("payment_link", link.as_str());
            }
        }
        Transition::View => {
            set.insert("viewed_at", at);
        }
        Transition::Pay => {
            set.insert("paid_at", at);
        }
    }
    Ok(doc! { "$set": set })
}

fn filter_document(user_id: &str, filter: InvoiceFilter) -> Document {
    let mut query = doc! { "user_id": user_id };
    match filter {
        InvoiceFilter::All => {}
        InvoiceFilter::Outstanding => {
            query.insert("status", doc! { "$ne": "paid" });
        }
        InvoiceFilter::Paid => {
            query.insert("status", "paid");
        }
        InvoiceFilter::Status(status) => {
            query.insert("status", status.as_str());
        }
    }
    query
}

#[async_trait]
impl InvoiceRepository for MongoStore {
    #[instrument(skip(self, invoice), fields(user_id = %invoice.user_id, invoice_id = %invoice.invoice_id))]
    async fn insert(&self, invoice: &Invoice) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_invoice"])
            .start_timer();

        self.invoices()
            .insert_one(invoice, None)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    AppError::Conflict(anyhow::anyhow!(
                        "invoice number {} is already in use",
                        invoice.invoice_number
                    ))
                } else {
                    db_error("Failed to insert invoice")(e)
                }
            })?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, user_id: &str, invoice_id: &str) -> Result<Option<Invoice>, AppError> {
        self.invoices()
            .find_one(doc! { "user_id": user_id, "invoice_id": invoice_id }, None)
            .await
            .map_err(db_error("Failed to find invoice"))
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, invoice_id: &str) -> Result<Option<Invoice>, AppError> {
        self.invoices()
            .find_one(doc! { "invoice_id": invoice_id }, None)
            .await
            .map_err(db_error("Failed to find invoice"))
    }

    #[instrument(skip(self))]
    async fn list(&self, user_id: &str, filter: InvoiceFilter) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let find_options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let cursor = self
            .invoices()
            .find(filter_document(user_id, filter), find_options)
            .await
            .map_err(db_error("Failed to list invoices"))?;

        let invoices: Vec<Invoice> = cursor
            .try_collect()
            .await
            .map_err(db_error("Failed to collect invoices"))?;

        timer.observe_duration();
        Ok(invoices)
    }

    #[instrument(skip(self, change), fields(transition = ?change.transition))]
    async fn apply_status_change(
        &self,
        user_id: &str,
        invoice_id: &str,
        change: &StatusChange,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice_status"])
            .start_timer();

        let allowed: Vec<&str> = change
            .transition
            .allowed_from()
            .iter()
            .map(|s| s.as_str())
            .collect();

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .invoices()
            .find_one_and_update(
                doc! {
                    "user_id": user_id,
                    "invoice_id": invoice_id,
                    "status": { "$in": allowed },
                },
                status_update(change)?,
                options,
            )
            .await
            .map_err(db_error("Failed to update invoice status"))?;

        timer.observe_duration();
        Ok(updated)
    }
}

#[async_trait]
impl LedgerRepository for MongoStore {
    #[instrument(skip(self, entry), fields(user_id = %entry.user_id, invoice_reference = ?entry.invoice_reference))]
    async fn insert(&self, entry: &IncomeEntry) -> Result<InsertOutcome, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_income_entry"])
            .start_timer();

        let outcome = match self.income_entries().insert_one(entry, None).await {
            Ok(_) => InsertOutcome::Inserted,
            Err(e) if is_duplicate_key(&e) => InsertOutcome::AlreadyExists,
            Err(e) => return Err(db_error("Failed to insert income entry")(e)),
        };

        timer.observe_duration();
        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn find_by_invoice_reference(
        &self,
        user_id: &str,
        invoice_reference: &str,
    ) -> Result<Option<IncomeEntry>, AppError> {
        self.income_entries()
            .find_one(
                doc! { "user_id": user_id, "invoice_reference": invoice_reference },
                None,
            )
            .await
            .map_err(db_error("Failed to find income entry"))
    }

    #[instrument(skip(self))]
    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<IncomeEntry>, AppError> {
        let find_options = FindOptions::builder()
            .sort(doc! { "date": -1, "created_at": -1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .build();

        let cursor = self
            .income_entries()
            .find(doc! { "user_id": user_id }, find_options)
            .await
            .map_err(db_error("Failed to list income entries"))?;

        cursor
            .try_collect()
            .await
            .map_err(db_error("Failed to collect income entries"))
    }
}

#[async_trait]
impl CounterRepository for MongoStore {
    #[instrument(skip(self))]
    async fn increment(&self, user_id: &str) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["increment_counter"])
            .start_timer();

        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let counter = self
            .counters()
            .find_one_and_update(
                doc! { "_id": user_id },
                doc! { "$inc": { "invoice_seq": 1_i64 } },
                options,
            )
            .await
            .map_err(db_error("Failed to increment invoice counter"))?;

        timer.observe_duration();

        let seq = counter
            .as_ref()
            .and_then(|d| d.get("invoice_seq"))
            .and_then(|v| match v {
                Bson::Int64(n) => u64::try_from(*n).ok(),
                Bson::Int32(n) => u64::try_from(*n).ok(),
                _ => None,
            })
            .ok_or_else(|| {
                AppError::DatabaseError(anyhow::anyhow!(
                    "Invoice counter for {} is missing or malformed",
                    user_id
                ))
            })?;

        Ok(seq)
    }
}

#[async_trait]
impl ProfileRepository for MongoStore {
    #[instrument(skip(self))]
    async fn get(&self, user_id: &str) -> Result<Option<CompanyProfile>, AppError> {
        self.company_profiles()
            .find_one(doc! { "_id": user_id }, None)
            .await
            .map_err(db_error("Failed to find company profile"))
    }

    #[instrument(skip(self, profile), fields(user_id = %profile.user_id))]
    async fn upsert(&self, profile: &CompanyProfile) -> Result<(), AppError> {
        let options = ReplaceOptions::builder().upsert(true).build();
        self.company_profiles()
            .replace_one(doc! { "_id": profile.user_id.as_str() }, profile, options)
            .await
            .map_err(db_error("Failed to save company profile"))?;
        Ok(())
    }
}

#[async_trait]
impl EmailLogRepository for MongoStore {
    #[instrument(skip(self, log), fields(invoice_id = %log.invoice_id, status = %log.status))]
    async fn insert(&self, log: &EmailLog) -> Result<(), AppError> {
        self.email_logs()
            .insert_one(log, None)
            .await
            .map_err(db_error("Failed to insert email log"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_for_invoice(
        &self,
        user_id: &str,
        invoice_id: &str,
    ) -> Result<Vec<EmailLog>, AppError> {
        let find_options = FindOptions::builder().sort(doc! { "sent_at": 1 }).build();
        let cursor = self
            .email_logs()
            .find(
                doc! { "user_id": user_id, "invoice_id": invoice_id },
                find_options,
            )
            .await
            .map_err(db_error("Failed to list email logs"))?;

        cursor
            .try_collect()
            .await
            .map_err(db_error("Failed to collect email logs"))
    }
}

#[async_trait]
impl StoreHealth for MongoStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(db_error("MongoDB health check failed"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvoiceStatus;
    use chrono::Utc;

    #[test]
    fn outstanding_filter_excludes_paid() {
        let query = filter_document("u1", InvoiceFilter::Outstanding);
        assert_eq!(query.get_str("user_id").unwrap(), "u1");
        assert_eq!(
            query.get_document("status").unwrap(),
            &doc! { "$ne": "paid" }
        );
    }

    #[test]
    fn status_filter_uses_literal_string() {
        let query = filter_document("u1", InvoiceFilter::Status(InvoiceStatus::Viewed));
        assert_eq!(query.get_str("status").unwrap(), "viewed");
    }

    #[test]
    fn send_update_sets_link_and_timestamp() {
        let change = StatusChange::sent("http://x/pay?invoice=1&amount=1.00".into(), Utc::now());
        let update = status_update(&change).unwrap();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "sent");
        assert!(set.contains_key("sent_at"));
        assert_eq!(
            set.get_str("payment_link").unwrap(),
            "http://x/pay?invoice=1&amount=1.00"
        );
        assert!(!set.contains_key("paid_at"));
    }
}
