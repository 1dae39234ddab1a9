//! SeaORM implementation of TeamRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;

use super::conditional_debit;
use crate::domain::{
    Charged, DomainError, FoundedTeam, NewTeam, Team, TeamMember, TeamRepository, TeamRole,
};
use crate::models::profile::Entity as ProfileEntity;
use crate::models::team::{self, ActiveModel as TeamActive, Column, Entity as TeamEntity};
use crate::models::team_member::{
    self, ActiveModel as MemberActive, Column as MemberColumn, Entity as MemberEntity,
};

/// SeaORM-based implementation of TeamRepository
pub struct SeaOrmTeamRepository {
    db: DatabaseConnection,
}

impl SeaOrmTeamRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn member_counts(&self) -> Result<HashMap<String, u64>, DomainError> {
        let counts = MemberEntity::find()
            .select_only()
            .column(MemberColumn::TeamId)
            .column_as(MemberColumn::Id.count(), "member_count")
            .group_by(MemberColumn::TeamId)
            .into_tuple::<(String, i64)>()
            .all(&self.db)
            .await?;
        Ok(counts
            .into_iter()
            .map(|(team_id, count)| (team_id, count.max(0) as u64))
            .collect())
    }
}

fn team_to_domain(model: team::Model, member_count: u64) -> Team {
    Team {
        id: model.id,
        name: model.name,
        description: model.description,
        created_by: model.created_by,
        created_at: model.created_at,
        member_count,
    }
}

fn member_to_domain(
    model: team_member::Model,
    username: Option<String>,
) -> Result<TeamMember, DomainError> {
    let role: TeamRole = model
        .role
        .parse()
        .map_err(|_| DomainError::Database(format!("Unknown team role '{}'", model.role)))?;
    Ok(TeamMember {
        id: model.id,
        team_id: model.team_id,
        user_id: model.user_id,
        username,
        role,
        joined_at: model.joined_at,
    })
}

async fn insert_member<C>(
    conn: &C,
    team_id: &str,
    user_id: &str,
    role: TeamRole,
) -> Result<TeamMember, DomainError>
where
    C: ConnectionTrait,
{
    let member = MemberActive {
        id: Set(uuid::Uuid::new_v4().to_string()),
        team_id: Set(team_id.to_string()),
        user_id: Set(user_id.to_string()),
        role: Set(role.as_str().to_string()),
        joined_at: Set(chrono::Utc::now().to_rfc3339()),
    }
    .insert(conn)
    .await?;
    member_to_domain(member, None)
}

#[async_trait]
impl TeamRepository for SeaOrmTeamRepository {
    async fn find_all(&self, search: Option<String>) -> Result<Vec<Team>, DomainError> {
        let mut query = TeamEntity::find().order_by_asc(Column::Name);
        if let Some(term) = search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            // SQLite LIKE is case-insensitive for ASCII
            query = query.filter(Column::Name.contains(term));
        }
        let teams = query.all(&self.db).await?;
        let counts = self.member_counts().await?;

        Ok(teams
            .into_iter()
            .map(|t| {
                let count = counts.get(&t.id).copied().unwrap_or(0);
                team_to_domain(t, count)
            })
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Team>, DomainError> {
        let Some(team) = TeamEntity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        let count = self.member_counts().await?.get(id).copied().unwrap_or(0);
        Ok(Some(team_to_domain(team, count)))
    }

    async fn members(&self, team_id: &str) -> Result<Vec<TeamMember>, DomainError> {
        MemberEntity::find()
            .filter(MemberColumn::TeamId.eq(team_id))
            .order_by_asc(MemberColumn::JoinedAt)
            .find_also_related(ProfileEntity)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|(member, profile)| member_to_domain(member, profile.map(|p| p.username)))
            .collect()
    }

    async fn find_membership(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<Option<TeamMember>, DomainError> {
        MemberEntity::find()
            .filter(MemberColumn::TeamId.eq(team_id))
            .filter(MemberColumn::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .map(|m| member_to_domain(m, None))
            .transpose()
    }

    async fn create_with_leader(
        &self,
        input: NewTeam,
        fee: i64,
    ) -> Result<Charged<FoundedTeam>, DomainError> {
        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.db.begin().await?;

        let team = TeamActive {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(input.name),
            description: Set(input.description),
            created_by: Set(input.created_by.clone()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let leader = insert_member(&txn, &team.id, &input.created_by, TeamRole::Leader).await?;
        let profile = conditional_debit(&txn, &input.created_by, fee).await?;

        txn.commit().await?;

        Ok(Charged {
            value: FoundedTeam {
                team: team_to_domain(team, 1),
                leader,
            },
            profile,
        })
    }

    async fn add_member(
        &self,
        team_id: &str,
        user_id: &str,
        role: TeamRole,
        fee: i64,
    ) -> Result<Charged<TeamMember>, DomainError> {
        let txn = self.db.begin().await?;

        if TeamEntity::find_by_id(team_id.to_string())
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(DomainError::NotFound("Team"));
        }

        let existing = MemberEntity::find()
            .filter(MemberColumn::TeamId.eq(team_id))
            .filter(MemberColumn::UserId.eq(user_id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(DomainError::Precondition(
                "You are already a member of this team".to_string(),
            ));
        }

        let member = insert_member(&txn, team_id, user_id, role).await?;
        let profile = conditional_debit(&txn, user_id, fee).await?;

        txn.commit().await?;

        Ok(Charged {
            value: member,
            profile,
        })
    }
}
