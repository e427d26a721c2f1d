//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations. Every write
//! runs in its own database transaction and is checked against the
//! referential rules in [`crate::integrity`] before it commits.

use crate::config::IntegrityConfig;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::input::{
    NewAgreement, NewArticle, NewAuthor, NewInstitution, NewJournal, NewPricingPolicy,
    NewPublisher, NewPublisherJournal, NewTransaction, Publication,
};
use crate::integrity::{self, Catalog};
use crate::metrics;
use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IsolationLevel, ModelTrait, PaginatorTrait, PrimaryKeyTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use tracing::{info, warn};
use validator::Validate;

/// Journal with the publisher and pricing policy it references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalView {
    pub journal: Journal,
    pub publisher: Publisher,
    pub pricing_policy: PricingPolicy,
}

/// Article with its journal and author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleView {
    pub article: Article,
    pub journal: Journal,
    pub author: Author,
}

/// Transaction with its article and, for institutional charges, the institution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionView {
    pub transaction: Transaction,
    pub article: Article,
    pub institution: Option<Institution>,
}

/// Agreement with both parties and the journals its terms apply to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementView {
    pub agreement: Agreement,
    pub publisher: Publisher,
    pub institution: Institution,
    pub eligible_journals: Vec<Journal>,
}

/// Anything that can produce a full snapshot of the publishing model
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load_catalog(&self) -> Result<Catalog>;
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
    integrity: IntegrityConfig,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            integrity: IntegrityConfig::default(),
        }
    }

    /// Replace the integrity settings
    pub fn with_integrity(mut self, integrity: IntegrityConfig) -> Self {
        self.integrity = integrity;
        self
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Writes validated against the whole policy forest. Two crossing
    /// re-parents read the same forest, so only one of them may commit.
    async fn begin_policy_write(&self) -> Result<DatabaseTransaction> {
        let txn = self
            .write_conn()
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?;
        Ok(txn)
    }

    /// Run a write and record its outcome
    async fn tracked<T, F>(&self, entity: EntityKind, operation: &'static str, write: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let outcome = write.await;
        match &outcome {
            Ok(_) => metrics::record_write(entity, operation),
            Err(err) => {
                warn!(
                    entity = %entity,
                    operation,
                    code = err.code().as_str(),
                    error = %err,
                    "Write rejected"
                );
                metrics::record_rejection(entity, operation, err.code());
            }
        }
        outcome
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Lookups by ID
    // ========================================================================

    pub async fn find_publisher(&self, id: i32) -> Result<Option<Publisher>> {
        PublisherEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_institution(&self, id: i32) -> Result<Option<Institution>> {
        InstitutionEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_pricing_policy(&self, id: i32) -> Result<Option<PricingPolicy>> {
        PricingPolicyEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_journal(&self, id: i32) -> Result<Option<Journal>> {
        JournalEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_author(&self, id: i32) -> Result<Option<Author>> {
        AuthorEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_article(&self, id: i32) -> Result<Option<Article>> {
        ArticleEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_transaction(&self, id: i32) -> Result<Option<Transaction>> {
        TransactionEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_agreement(&self, id: i32) -> Result<Option<Agreement>> {
        AgreementEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // One-side Lookups
    // ========================================================================

    /// Journals published by a publisher
    pub async fn journals_of_publisher(&self, publisher_id: i32) -> Result<Vec<Journal>> {
        JournalEntity::find()
            .filter(JournalColumn::PublisherId.eq(publisher_id))
            .order_by_asc(JournalColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Articles written by an author
    pub async fn articles_by_author(&self, author_id: i32) -> Result<Vec<Article>> {
        ArticleEntity::find()
            .filter(ArticleColumn::AuthorId.eq(author_id))
            .order_by_asc(ArticleColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Agreements an institution is party to
    pub async fn agreements_of_institution(&self, institution_id: i32) -> Result<Vec<Agreement>> {
        AgreementEntity::find()
            .filter(AgreementColumn::InstitutionId.eq(institution_id))
            .order_by_asc(AgreementColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Journals an agreement's terms apply to
    pub async fn eligible_journals(&self, agreement_id: i32) -> Result<Vec<Journal>> {
        eligible_journals_in(self.read_conn(), agreement_id).await
    }

    /// Charges raised against an article
    pub async fn transactions_for_article(&self, article_id: i32) -> Result<Vec<Transaction>> {
        TransactionEntity::find()
            .filter(TransactionColumn::ArticleId.eq(article_id))
            .order_by_asc(TransactionColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Policies whose parent is `policy_id`
    pub async fn child_policies(&self, policy_id: i32) -> Result<Vec<PricingPolicy>> {
        PricingPolicyEntity::find()
            .filter(PricingPolicyColumn::ParentPolicyId.eq(policy_id))
            .order_by_asc(PricingPolicyColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub async fn journal_view(&self, journal_id: i32) -> Result<JournalView> {
        let conn = self.read_conn();
        let journal = found::<JournalEntity, _>(conn, EntityKind::Journal, journal_id).await?;

        let publisher = journal
            .find_related(PublisherEntity)
            .one(conn)
            .await?
            .ok_or(AppError::MissingReference { entity: EntityKind::Publisher, id: journal.publisher_id })?;

        let pricing_policy = journal
            .find_related(PricingPolicyEntity)
            .one(conn)
            .await?
            .ok_or(AppError::MissingReference {
                entity: EntityKind::PricingPolicy,
                id: journal.pricing_policy_id,
            })?;

        Ok(JournalView { journal, publisher, pricing_policy })
    }

    pub async fn article_view(&self, article_id: i32) -> Result<ArticleView> {
        let conn = self.read_conn();
        let article = found::<ArticleEntity, _>(conn, EntityKind::Article, article_id).await?;

        let journal = article
            .find_related(JournalEntity)
            .one(conn)
            .await?
            .ok_or(AppError::MissingReference { entity: EntityKind::Journal, id: article.journal_id })?;

        let author = article
            .find_related(AuthorEntity)
            .one(conn)
            .await?
            .ok_or(AppError::MissingReference { entity: EntityKind::Author, id: article.author_id })?;

        Ok(ArticleView { article, journal, author })
    }

    pub async fn transaction_view(&self, transaction_id: i32) -> Result<TransactionView> {
        let conn = self.read_conn();
        let transaction =
            found::<TransactionEntity, _>(conn, EntityKind::Transaction, transaction_id).await?;

        let article = transaction
            .find_related(ArticleEntity)
            .one(conn)
            .await?
            .ok_or(AppError::MissingReference { entity: EntityKind::Article, id: transaction.article_id })?;

        let institution = match transaction.institution_id {
            Some(id) => Some(required::<InstitutionEntity, _>(conn, EntityKind::Institution, id).await?),
            None => None,
        };

        Ok(TransactionView { transaction, article, institution })
    }

    pub async fn agreement_view(&self, agreement_id: i32) -> Result<AgreementView> {
        let conn = self.read_conn();
        let agreement = found::<AgreementEntity, _>(conn, EntityKind::Agreement, agreement_id).await?;

        let publisher = agreement
            .find_related(PublisherEntity)
            .one(conn)
            .await?
            .ok_or(AppError::MissingReference { entity: EntityKind::Publisher, id: agreement.publisher_id })?;

        let institution = agreement
            .find_related(InstitutionEntity)
            .one(conn)
            .await?
            .ok_or(AppError::MissingReference {
                entity: EntityKind::Institution,
                id: agreement.institution_id,
            })?;

        let eligible_journals = agreement
            .find_related(JournalEntity)
            .order_by_asc(JournalColumn::Id)
            .all(conn)
            .await?;

        Ok(AgreementView { agreement, publisher, institution, eligible_journals })
    }

    // ========================================================================
    // Pricing Policy Chains
    // ========================================================================

    /// Policies from `policy_id` up to its root, nearest first
    pub async fn policy_chain(&self, policy_id: i32) -> Result<Vec<PricingPolicy>> {
        let conn = self.read_conn();
        let parents = policy_parents(conn).await?;
        let ids = integrity::walk_policy_chain(policy_id, self.integrity.max_policy_depth, |id| {
            parents.get(&id).copied()
        })?;

        let mut by_id: HashMap<i32, PricingPolicy> = PricingPolicyEntity::find()
            .filter(PricingPolicyColumn::Id.is_in(ids.clone()))
            .all(conn)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        ids.into_iter()
            .map(|id| {
                by_id
                    .remove(&id)
                    .ok_or(AppError::MissingReference { entity: EntityKind::PricingPolicy, id })
            })
            .collect()
    }

    // ========================================================================
    // Publisher & Institution Writes
    // ========================================================================

    pub async fn create_publisher(&self, draft: NewPublisher) -> Result<Publisher> {
        self.tracked(EntityKind::Publisher, "create", async move {
            draft.validate()?;
            let publisher = draft.into_active_model().insert(self.write_conn()).await?;
            info!(publisher_id = publisher.id, "Publisher created");
            Ok::<_, AppError>(publisher)
        })
        .await
    }

    /// Create a publisher and its first journals atomically
    pub async fn create_publisher_with_journals(
        &self,
        draft: NewPublisher,
        journals: Vec<NewPublisherJournal>,
    ) -> Result<(Publisher, Vec<Journal>)> {
        self.tracked(EntityKind::Publisher, "create_with_journals", async move {
            draft.validate()?;
            for journal in &journals {
                journal.validate()?;
            }

            let txn = self.write_conn().begin().await?;
            let publisher = draft.into_active_model().insert(&txn).await?;

            let mut created = Vec::with_capacity(journals.len());
            for journal in journals {
                required::<PricingPolicyEntity, _>(&txn, EntityKind::PricingPolicy, journal.pricing_policy_id)
                    .await?;

                let model = JournalActiveModel {
                    publisher_id: Set(publisher.id),
                    name: Set(journal.name),
                    pricing_policy_id: Set(journal.pricing_policy_id),
                    ..Default::default()
                };
                created.push(model.insert(&txn).await?);
            }

            txn.commit().await?;
            info!(publisher_id = publisher.id, journals = created.len(), "Publisher created");
            Ok::<_, AppError>((publisher, created))
        })
        .await
    }

    pub async fn create_institution(&self, draft: NewInstitution) -> Result<Institution> {
        self.tracked(EntityKind::Institution, "create", async move {
            draft.validate()?;
            let institution = draft.into_active_model().insert(self.write_conn()).await?;
            info!(institution_id = institution.id, kind = %institution.kind(), "Institution created");
            Ok::<_, AppError>(institution)
        })
        .await
    }

    // ========================================================================
    // Pricing Policy Writes
    // ========================================================================

    pub async fn create_pricing_policy(&self, draft: NewPricingPolicy) -> Result<PricingPolicy> {
        self.tracked(EntityKind::PricingPolicy, "create", async move {
            draft.validate()?;

            let txn = self.begin_policy_write().await?;
            if let Some(parent_id) = draft.parent_policy_id {
                required::<PricingPolicyEntity, _>(&txn, EntityKind::PricingPolicy, parent_id).await?;
            }

            let policy = draft.into_active_model().insert(&txn).await?;

            // Nothing points at the new row yet, so only depth can fail here
            let parents = policy_parents(&txn).await?;
            integrity::walk_policy_chain(policy.id, self.integrity.max_policy_depth, |id| {
                parents.get(&id).copied()
            })?;

            txn.commit().await?;
            info!(policy_id = policy.id, parent = ?policy.parent_policy_id, "Pricing policy created");
            Ok::<_, AppError>(policy)
        })
        .await
    }

    /// Re-parent a policy. Rejected if the new parent is the policy itself or
    /// one of its descendants, or if any chain would grow past the depth limit.
    pub async fn set_policy_parent(&self, policy_id: i32, parent_id: Option<i32>) -> Result<PricingPolicy> {
        self.tracked(EntityKind::PricingPolicy, "set_parent", async move {
            let txn = self.begin_policy_write().await?;
            let policy = found::<PricingPolicyEntity, _>(&txn, EntityKind::PricingPolicy, policy_id).await?;
            if let Some(parent_id) = parent_id {
                required::<PricingPolicyEntity, _>(&txn, EntityKind::PricingPolicy, parent_id).await?;
            }

            let mut parents = policy_parents(&txn).await?;
            parents.insert(policy_id, parent_id);

            let max_depth = self.integrity.max_policy_depth;
            let lookup = |id: i32| parents.get(&id).copied();
            integrity::walk_policy_chain(policy_id, max_depth, lookup)?;
            for descendant in descendants(&parents, policy_id) {
                integrity::walk_policy_chain(descendant, max_depth, lookup)?;
            }

            let mut active: PricingPolicyActiveModel = policy.into();
            active.parent_policy_id = Set(parent_id);
            let policy = active.update(&txn).await?;

            txn.commit().await?;
            info!(policy_id, parent = ?parent_id, "Pricing policy re-parented");
            Ok::<_, AppError>(policy)
        })
        .await
    }

    // ========================================================================
    // Journal, Author & Article Writes
    // ========================================================================

    pub async fn create_journal(&self, draft: NewJournal) -> Result<Journal> {
        self.tracked(EntityKind::Journal, "create", async move {
            draft.validate()?;

            let txn = self.write_conn().begin().await?;
            required::<PublisherEntity, _>(&txn, EntityKind::Publisher, draft.publisher_id).await?;
            required::<PricingPolicyEntity, _>(&txn, EntityKind::PricingPolicy, draft.pricing_policy_id).await?;

            let journal = draft.into_active_model().insert(&txn).await?;
            txn.commit().await?;

            info!(journal_id = journal.id, publisher_id = journal.publisher_id, "Journal created");
            Ok::<_, AppError>(journal)
        })
        .await
    }

    pub async fn create_author(&self, draft: NewAuthor) -> Result<Author> {
        self.tracked(EntityKind::Author, "create", async move {
            draft.validate()?;

            let txn = self.write_conn().begin().await?;
            if let Some(institution_id) = draft.institution_id {
                required::<InstitutionEntity, _>(&txn, EntityKind::Institution, institution_id).await?;
            }

            let author = draft.into_active_model().insert(&txn).await?;
            txn.commit().await?;

            info!(author_id = author.id, "Author created");
            Ok::<_, AppError>(author)
        })
        .await
    }

    pub async fn create_article(&self, draft: NewArticle) -> Result<Article> {
        self.tracked(EntityKind::Article, "create", async move {
            draft.validate()?;

            let txn = self.write_conn().begin().await?;
            required::<AuthorEntity, _>(&txn, EntityKind::Author, draft.author_id).await?;
            required::<JournalEntity, _>(&txn, EntityKind::Journal, draft.journal_id).await?;

            let article = draft.into_active_model().insert(&txn).await?;
            article.check_dates()?;
            article.check_doi()?;
            txn.commit().await?;

            info!(article_id = article.id, journal_id = article.journal_id, "Article created");
            Ok::<_, AppError>(article)
        })
        .await
    }

    /// Mark an article as published
    pub async fn record_publication(&self, article_id: i32, publication: Publication) -> Result<Article> {
        self.tracked(EntityKind::Article, "publish", async move {
            publication.validate()?;

            let txn = self.write_conn().begin().await?;
            let article = found::<ArticleEntity, _>(&txn, EntityKind::Article, article_id).await?;

            let mut active: ArticleActiveModel = article.into();
            active.publication_date = Set(Some(publication.publication_date));
            if let Some(doi) = publication.doi {
                active.doi = Set(Some(doi));
            }
            if let Some(status) = publication.publication_status {
                active.publication_status = Set(status);
            }

            let article = active.update(&txn).await?;
            article.check_dates()?;
            article.check_doi()?;
            txn.commit().await?;

            info!(article_id, doi = ?article.doi, "Article published");
            Ok::<_, AppError>(article)
        })
        .await
    }

    // ========================================================================
    // Agreement Writes
    // ========================================================================

    /// Create an agreement together with its eligible journals
    pub async fn create_agreement(&self, draft: NewAgreement) -> Result<Agreement> {
        self.tracked(EntityKind::Agreement, "create", async move {
            draft.validate()?;
            integrity::check_date_range("agreement", draft.start_date, draft.end_date)?;

            let txn = self.write_conn().begin().await?;
            required::<PublisherEntity, _>(&txn, EntityKind::Publisher, draft.publisher_id).await?;
            required::<InstitutionEntity, _>(&txn, EntityKind::Institution, draft.institution_id).await?;

            let journal_ids: BTreeSet<i32> = draft.eligible_journal_ids.iter().copied().collect();
            for &journal_id in &journal_ids {
                let journal = required::<JournalEntity, _>(&txn, EntityKind::Journal, journal_id).await?;
                integrity::check_eligible_journal(draft.publisher_id, &journal)?;
            }

            let agreement = draft.to_active_model().insert(&txn).await?;

            if !journal_ids.is_empty() {
                let links = journal_ids.iter().map(|&journal_id| AgreementJournalActiveModel {
                    agreement_id: Set(agreement.id),
                    journal_id: Set(journal_id),
                });
                AgreementJournalEntity::insert_many(links)
                    .exec_without_returning(&txn)
                    .await?;
            }

            txn.commit().await?;
            info!(
                agreement_id = agreement.id,
                publisher_id = agreement.publisher_id,
                institution_id = agreement.institution_id,
                journals = journal_ids.len(),
                "Agreement created"
            );
            Ok::<_, AppError>(agreement)
        })
        .await
    }

    /// Add a journal to an agreement's eligible list. Adding an existing link
    /// is a no-op.
    pub async fn add_eligible_journal(&self, agreement_id: i32, journal_id: i32) -> Result<()> {
        self.tracked(EntityKind::Agreement, "add_eligible_journal", async move {
            let txn = self.write_conn().begin().await?;
            let agreement = found::<AgreementEntity, _>(&txn, EntityKind::Agreement, agreement_id).await?;
            let journal = required::<JournalEntity, _>(&txn, EntityKind::Journal, journal_id).await?;
            integrity::check_eligible_journal(agreement.publisher_id, &journal)?;

            let existing = AgreementJournalEntity::find_by_id((agreement_id, journal_id))
                .one(&txn)
                .await?;
            if existing.is_none() {
                AgreementJournalActiveModel {
                    agreement_id: Set(agreement_id),
                    journal_id: Set(journal_id),
                }
                .insert(&txn)
                .await?;
            }

            txn.commit().await?;
            Ok::<_, AppError>(())
        })
        .await
    }

    /// Returns whether a link was removed
    pub async fn remove_eligible_journal(&self, agreement_id: i32, journal_id: i32) -> Result<bool> {
        self.tracked(EntityKind::Agreement, "remove_eligible_journal", async move {
            let result = AgreementJournalEntity::delete_by_id((agreement_id, journal_id))
                .exec(self.write_conn())
                .await?;
            Ok::<_, AppError>(result.rows_affected > 0)
        })
        .await
    }

    // ========================================================================
    // Transaction Writes
    // ========================================================================

    /// Record a charge. An institutional charge must fall under an agreement
    /// of that institution that is active on the charge date and lists the
    /// article's journal; whether a miss is rejected or only logged depends on
    /// `require_agreement_coverage`.
    pub async fn create_transaction(&self, draft: NewTransaction) -> Result<Transaction> {
        self.tracked(EntityKind::Transaction, "create", async move {
            draft.validate()?;

            let txn = self.write_conn().begin().await?;
            let article = required::<ArticleEntity, _>(&txn, EntityKind::Article, draft.article_id).await?;

            if let Some(institution_id) = draft.institution_id {
                required::<InstitutionEntity, _>(&txn, EntityKind::Institution, institution_id).await?;

                let date = draft.transaction_date.date_naive();
                let agreements = AgreementEntity::find()
                    .filter(AgreementColumn::InstitutionId.eq(institution_id))
                    .all(&txn)
                    .await?;

                let mut covered = false;
                for agreement in &agreements {
                    let eligible = eligible_journal_ids_in(&txn, agreement.id).await?;
                    if integrity::agreement_covers(agreement, &eligible, article.journal_id, date) {
                        covered = true;
                        break;
                    }
                }

                if !covered {
                    let err = AppError::UncoveredInstitutionalCharge {
                        institution_id,
                        journal_id: article.journal_id,
                        date,
                    };
                    if self.integrity.require_agreement_coverage {
                        return Err(err);
                    }
                    warn!(article_id = article.id, error = %err, "Recording uncovered institutional charge");
                }
            }

            let transaction = draft.into_active_model().insert(&txn).await?;
            txn.commit().await?;

            info!(
                transaction_id = transaction.id,
                article_id = transaction.article_id,
                institutional = transaction.is_institutional(),
                "Transaction recorded"
            );
            Ok::<_, AppError>(transaction)
        })
        .await
    }

    // ========================================================================
    // Deletes
    // ========================================================================

    /// Returns `Ok(false)` if the publisher does not exist
    pub async fn delete_publisher(&self, id: i32) -> Result<bool> {
        self.tracked(EntityKind::Publisher, "delete", async move {
            let txn = self.write_conn().begin().await?;
            if PublisherEntity::find_by_id(id).one(&txn).await?.is_none() {
                return Ok(false);
            }

            let journals = JournalEntity::find()
                .filter(JournalColumn::PublisherId.eq(id))
                .count(&txn)
                .await?;
            unreferenced(EntityKind::Publisher, id, EntityKind::Journal, journals)?;

            let agreements = AgreementEntity::find()
                .filter(AgreementColumn::PublisherId.eq(id))
                .count(&txn)
                .await?;
            unreferenced(EntityKind::Publisher, id, EntityKind::Agreement, agreements)?;

            PublisherEntity::delete_by_id(id).exec(&txn).await?;
            txn.commit().await?;
            Ok::<_, AppError>(true)
        })
        .await
    }

    /// Authors affiliated with the institution keep their free-text
    /// affiliation and lose the reference.
    pub async fn delete_institution(&self, id: i32) -> Result<bool> {
        self.tracked(EntityKind::Institution, "delete", async move {
            let txn = self.write_conn().begin().await?;
            if InstitutionEntity::find_by_id(id).one(&txn).await?.is_none() {
                return Ok(false);
            }

            let agreements = AgreementEntity::find()
                .filter(AgreementColumn::InstitutionId.eq(id))
                .count(&txn)
                .await?;
            unreferenced(EntityKind::Institution, id, EntityKind::Agreement, agreements)?;

            let transactions = TransactionEntity::find()
                .filter(TransactionColumn::InstitutionId.eq(id))
                .count(&txn)
                .await?;
            unreferenced(EntityKind::Institution, id, EntityKind::Transaction, transactions)?;

            AuthorEntity::update_many()
                .col_expr(AuthorColumn::InstitutionId, Expr::value(None::<i32>))
                .filter(AuthorColumn::InstitutionId.eq(id))
                .exec(&txn)
                .await?;

            InstitutionEntity::delete_by_id(id).exec(&txn).await?;
            txn.commit().await?;
            Ok::<_, AppError>(true)
        })
        .await
    }

    pub async fn delete_pricing_policy(&self, id: i32) -> Result<bool> {
        self.tracked(EntityKind::PricingPolicy, "delete", async move {
            let txn = self.write_conn().begin().await?;
            if PricingPolicyEntity::find_by_id(id).one(&txn).await?.is_none() {
                return Ok(false);
            }

            let children = PricingPolicyEntity::find()
                .filter(PricingPolicyColumn::ParentPolicyId.eq(id))
                .count(&txn)
                .await?;
            unreferenced(EntityKind::PricingPolicy, id, EntityKind::PricingPolicy, children)?;

            let journals = JournalEntity::find()
                .filter(JournalColumn::PricingPolicyId.eq(id))
                .count(&txn)
                .await?;
            unreferenced(EntityKind::PricingPolicy, id, EntityKind::Journal, journals)?;

            PricingPolicyEntity::delete_by_id(id).exec(&txn).await?;
            txn.commit().await?;
            Ok::<_, AppError>(true)
        })
        .await
    }

    pub async fn delete_journal(&self, id: i32) -> Result<bool> {
        self.tracked(EntityKind::Journal, "delete", async move {
            let txn = self.write_conn().begin().await?;
            if JournalEntity::find_by_id(id).one(&txn).await?.is_none() {
                return Ok(false);
            }

            let articles = ArticleEntity::find()
                .filter(ArticleColumn::JournalId.eq(id))
                .count(&txn)
                .await?;
            unreferenced(EntityKind::Journal, id, EntityKind::Article, articles)?;

            let agreements = AgreementJournalEntity::find()
                .filter(AgreementJournalColumn::JournalId.eq(id))
                .count(&txn)
                .await?;
            unreferenced(EntityKind::Journal, id, EntityKind::Agreement, agreements)?;

            JournalEntity::delete_by_id(id).exec(&txn).await?;
            txn.commit().await?;
            Ok::<_, AppError>(true)
        })
        .await
    }

    pub async fn delete_author(&self, id: i32) -> Result<bool> {
        self.tracked(EntityKind::Author, "delete", async move {
            let txn = self.write_conn().begin().await?;
            if AuthorEntity::find_by_id(id).one(&txn).await?.is_none() {
                return Ok(false);
            }

            let articles = ArticleEntity::find()
                .filter(ArticleColumn::AuthorId.eq(id))
                .count(&txn)
                .await?;
            unreferenced(EntityKind::Author, id, EntityKind::Article, articles)?;

            AuthorEntity::delete_by_id(id).exec(&txn).await?;
            txn.commit().await?;
            Ok::<_, AppError>(true)
        })
        .await
    }

    pub async fn delete_article(&self, id: i32) -> Result<bool> {
        self.tracked(EntityKind::Article, "delete", async move {
            let txn = self.write_conn().begin().await?;
            if ArticleEntity::find_by_id(id).one(&txn).await?.is_none() {
                return Ok(false);
            }

            let transactions = TransactionEntity::find()
                .filter(TransactionColumn::ArticleId.eq(id))
                .count(&txn)
                .await?;
            unreferenced(EntityKind::Article, id, EntityKind::Transaction, transactions)?;

            ArticleEntity::delete_by_id(id).exec(&txn).await?;
            txn.commit().await?;
            Ok::<_, AppError>(true)
        })
        .await
    }

    /// Deletes the agreement and its eligibility links
    pub async fn delete_agreement(&self, id: i32) -> Result<bool> {
        self.tracked(EntityKind::Agreement, "delete", async move {
            let txn = self.write_conn().begin().await?;
            AgreementJournalEntity::delete_many()
                .filter(AgreementJournalColumn::AgreementId.eq(id))
                .exec(&txn)
                .await?;
            let result = AgreementEntity::delete_by_id(id).exec(&txn).await?;
            txn.commit().await?;
            Ok::<_, AppError>(result.rows_affected > 0)
        })
        .await
    }

    pub async fn delete_transaction(&self, id: i32) -> Result<bool> {
        self.tracked(EntityKind::Transaction, "delete", async move {
            let result = TransactionEntity::delete_by_id(id)
                .exec(self.write_conn())
                .await?;
            Ok::<_, AppError>(result.rows_affected > 0)
        })
        .await
    }

    // ========================================================================
    // Snapshot
    // ========================================================================

    /// Load every row into an in-memory [`Catalog`]
    pub async fn load_catalog(&self) -> Result<Catalog> {
        let conn = self.read_conn();
        let mut catalog = Catalog::new(self.integrity.max_policy_depth);

        for publisher in PublisherEntity::find().all(conn).await? {
            catalog.insert_publisher(publisher);
        }
        for institution in InstitutionEntity::find().all(conn).await? {
            catalog.insert_institution(institution);
        }
        for policy in PricingPolicyEntity::find().all(conn).await? {
            catalog.insert_pricing_policy(policy);
        }
        for journal in JournalEntity::find().all(conn).await? {
            catalog.insert_journal(journal);
        }
        for author in AuthorEntity::find().all(conn).await? {
            catalog.insert_author(author);
        }
        for article in ArticleEntity::find().all(conn).await? {
            catalog.insert_article(article);
        }
        for transaction in TransactionEntity::find().all(conn).await? {
            catalog.insert_transaction(transaction);
        }
        for agreement in AgreementEntity::find().all(conn).await? {
            catalog.insert_agreement(agreement);
        }
        for link in AgreementJournalEntity::find().all(conn).await? {
            catalog.link_eligible_journal(link.agreement_id, link.journal_id);
        }

        Ok(catalog)
    }
}

#[async_trait]
impl CatalogSource for Repository {
    async fn load_catalog(&self) -> Result<Catalog> {
        Repository::load_catalog(self).await
    }
}

/// Fetch a row the caller is operating on
async fn found<E, C>(conn: &C, entity: EntityKind, id: i32) -> Result<E::Model>
where
    E: EntityTrait,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = i32>,
    C: ConnectionTrait,
{
    E::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound { entity, id })
}

/// Fetch a row another row refers to
async fn required<E, C>(conn: &C, entity: EntityKind, id: i32) -> Result<E::Model>
where
    E: EntityTrait,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = i32>,
    C: ConnectionTrait,
{
    E::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::MissingReference { entity, id })
}

fn unreferenced(entity: EntityKind, id: i32, dependents: EntityKind, count: u64) -> Result<()> {
    if count > 0 {
        return Err(AppError::StillReferenced { entity, id, dependents, count });
    }
    Ok(())
}

/// Every policy's parent link, keyed by policy id
async fn policy_parents<C: ConnectionTrait>(conn: &C) -> Result<HashMap<i32, Option<i32>>> {
    let pairs: Vec<(i32, Option<i32>)> = PricingPolicyEntity::find()
        .select_only()
        .column(PricingPolicyColumn::Id)
        .column(PricingPolicyColumn::ParentPolicyId)
        .into_tuple()
        .all(conn)
        .await?;
    Ok(pairs.into_iter().collect())
}

/// Policies whose chain passes through `root`, excluding `root`
fn descendants(parents: &HashMap<i32, Option<i32>>, root: i32) -> Vec<i32> {
    let mut children: HashMap<i32, Vec<i32>> = HashMap::new();
    for (&id, &parent) in parents {
        if let Some(parent) = parent {
            children.entry(parent).or_default().push(id);
        }
    }

    let mut seen = BTreeSet::from([root]);
    let mut stack = vec![root];
    let mut out = Vec::new();
    while let Some(id) = stack.pop() {
        for &child in children.get(&id).into_iter().flatten() {
            if seen.insert(child) {
                out.push(child);
                stack.push(child);
            }
        }
    }
    out
}

async fn eligible_journal_ids_in<C: ConnectionTrait>(conn: &C, agreement_id: i32) -> Result<BTreeSet<i32>> {
    let links = AgreementJournalEntity::find()
        .filter(AgreementJournalColumn::AgreementId.eq(agreement_id))
        .all(conn)
        .await?;
    Ok(links.into_iter().map(|link| link.journal_id).collect())
}

async fn eligible_journals_in<C: ConnectionTrait>(conn: &C, agreement_id: i32) -> Result<Vec<Journal>> {
    let ids = eligible_journal_ids_in(conn, agreement_id).await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    JournalEntity::find()
        .filter(JournalColumn::Id.is_in(ids))
        .order_by_asc(JournalColumn::Id)
        .all(conn)
        .await
        .map_err(Into::into)
}
