//! PostgreSQL-backed profiles, portfolio items and badges

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::domain::{AdminId, BadgeLevel, PortfolioItem, Profile, ProfileId, UserBadge};
use crate::infra::{BadgeRepository, PortfolioRepository, ProfileRepository, Result};

use super::decode;

const PROFILE_COLUMNS: &str = "id, full_name, email, phone, company_name, trade, address, \
     is_verified, badge_level, verification_completed_at, approved_at, is_paid, paid_at, \
     member_number, created_at, updated_at";

/// PostgreSQL-backed member data: `profiles`, `portfolio_items`, `user_badges`
#[derive(Clone)]
pub struct PgMemberStore {
    pool: PgPool,
}

impl PgMemberStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgMemberStore {
    async fn get(&self, id: &ProfileId) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn save(&self, profile: &Profile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (
                id, full_name, email, phone, company_name, trade, address,
                is_verified, badge_level, verification_completed_at, approved_at,
                is_paid, paid_at, member_number, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE SET
                full_name = EXCLUDED.full_name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                company_name = EXCLUDED.company_name,
                trade = EXCLUDED.trade,
                address = EXCLUDED.address,
                is_verified = EXCLUDED.is_verified,
                badge_level = EXCLUDED.badge_level,
                verification_completed_at = EXCLUDED.verification_completed_at,
                approved_at = EXCLUDED.approved_at,
                is_paid = EXCLUDED.is_paid,
                paid_at = EXCLUDED.paid_at,
                member_number = EXCLUDED.member_number,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(profile.id.0)
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(&profile.company_name)
        .bind(&profile.trade)
        .bind(&profile.address)
        .bind(profile.is_verified)
        .bind(profile.badge_level.as_str())
        .bind(profile.verification_completed_at)
        .bind(profile.approved_at)
        .bind(profile.is_paid)
        .bind(profile.paid_at)
        .bind(&profile.member_number)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_verified(&self) -> Result<Vec<Profile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE is_verified \
             ORDER BY approved_at DESC NULLS LAST"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Profile::try_from).collect()
    }
}

#[async_trait]
impl PortfolioRepository for PgMemberStore {
    async fn list_for_user(&self, user_id: &ProfileId) -> Result<Vec<PortfolioItem>> {
        let rows = sqlx::query_as::<_, PortfolioRow>(
            r#"
            SELECT id, user_id, title, description, image_path, created_at
            FROM portfolio_items
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PortfolioItem {
                id: row.id,
                user_id: ProfileId::from_uuid(row.user_id),
                title: row.title,
                description: row.description,
                image_path: row.image_path,
                created_at: row.created_at,
            })
            .collect())
    }
}

#[async_trait]
impl BadgeRepository for PgMemberStore {
    async fn upsert(&self, badge: &UserBadge) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_badges (user_id, badge_level, granted_by, granted_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, badge_level) DO UPDATE SET
                granted_by = EXCLUDED.granted_by,
                granted_at = EXCLUDED.granted_at
            "#,
        )
        .bind(badge.user_id.0)
        .bind(badge.badge_level.as_str())
        .bind(badge.granted_by.0)
        .bind(badge.granted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_user(&self, user_id: &ProfileId) -> Result<Vec<UserBadge>> {
        let rows = sqlx::query_as::<_, BadgeRow>(
            r#"
            SELECT user_id, badge_level, granted_by, granted_at
            FROM user_badges
            WHERE user_id = $1
            ORDER BY granted_at
            "#,
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(UserBadge {
                    user_id: ProfileId::from_uuid(row.user_id),
                    badge_level: decode::<BadgeLevel>(&row.badge_level, "badge_level")?,
                    granted_by: AdminId::from_uuid(row.granted_by),
                    granted_at: row.granted_at,
                })
            })
            .collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    full_name: String,
    email: String,
    phone: Option<String>,
    company_name: Option<String>,
    trade: Option<String>,
    address: Option<String>,
    is_verified: bool,
    badge_level: String,
    verification_completed_at: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    member_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = crate::infra::WorkflowError;

    fn try_from(row: ProfileRow) -> Result<Self> {
        Ok(Self {
            id: ProfileId::from_uuid(row.id),
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            company_name: row.company_name,
            trade: row.trade,
            address: row.address,
            is_verified: row.is_verified,
            badge_level: decode(&row.badge_level, "badge_level")?,
            verification_completed_at: row.verification_completed_at,
            approved_at: row.approved_at,
            is_paid: row.is_paid,
            paid_at: row.paid_at,
            member_number: row.member_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PortfolioRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    image_path: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct BadgeRow {
    user_id: Uuid,
    badge_level: String,
    granted_by: Uuid,
    granted_at: DateTime<Utc>,
}
