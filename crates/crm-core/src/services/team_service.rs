//! Team service

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::domain::Team;
use crate::error::DomainError;
use crate::repositories::{TeamRepository, UserRepository};

#[derive(Debug, Clone, Deserialize)]
pub struct NewTeam {
    pub name: String,
    pub leader_id: Option<Uuid>,
    #[serde(default)]
    pub member_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamChanges {
    pub name: Option<String>,
    pub leader_id: Option<Uuid>,
}

pub struct TeamService<T: TeamRepository, U: UserRepository> {
    team_repo: Arc<T>,
    user_repo: Arc<U>,
}

impl<T: TeamRepository, U: UserRepository> TeamService<T, U> {
    pub fn new(team_repo: Arc<T>, user_repo: Arc<U>) -> Self {
        Self { team_repo, user_repo }
    }

    pub async fn list(&self) -> Result<Vec<Team>, DomainError> {
        self.team_repo.list().await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Team, DomainError> {
        self.team_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("team", id))
    }

    pub async fn create(&self, input: NewTeam) -> Result<Team, DomainError> {
        let mut team = Team::new(&input.name, input.leader_id)?;
        team.set_members(input.member_ids);
        self.ensure_users_exist(&team.member_ids).await?;
        let team = self.team_repo.create(&team).await?;
        info!("Team created: {} ({} members)", team.name, team.member_ids.len());
        Ok(team)
    }

    pub async fn update(&self, id: &Uuid, changes: TeamChanges) -> Result<Team, DomainError> {
        let mut team = self.get(id).await?;
        if let Some(name) = changes.name {
            team.rename(&name)?;
        }
        if let Some(leader_id) = changes.leader_id {
            self.ensure_users_exist(&[leader_id]).await?;
            team.set_leader(Some(leader_id));
        }
        self.team_repo.update(&team).await
    }

    pub async fn set_members(&self, id: &Uuid, member_ids: Vec<Uuid>) -> Result<Team, DomainError> {
        let mut team = self.get(id).await?;
        team.set_members(member_ids);
        self.ensure_users_exist(&team.member_ids).await?;
        self.team_repo.update(&team).await
    }

    pub async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let team = self.get(id).await?;
        self.team_repo.delete(&team.id).await
    }

    async fn ensure_users_exist(&self, ids: &[Uuid]) -> Result<(), DomainError> {
        if ids.is_empty() {
            return Ok(());
        }
        let found = self.user_repo.existing_ids(ids.to_vec()).await?;
        match ids.iter().find(|id| !found.contains(id)) {
            Some(missing) => Err(DomainError::not_found("user", missing)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{MockTeamRepository, MockUserRepository};

    #[tokio::test]
    async fn test_members_must_exist() {
        let team = Team::new("North", None).unwrap();
        let id = team.id;
        let known = Uuid::new_v4();
        let mut teams = MockTeamRepository::new();
        teams.expect_find_by_id().returning(move |_| Ok(Some(team.clone())));
        teams.expect_update().never();
        let mut users = MockUserRepository::new();
        users.expect_existing_ids().returning(move |_| Ok(vec![known]));

        let result = TeamService::new(Arc::new(teams), Arc::new(users))
            .set_members(&id, vec![known, Uuid::new_v4()])
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { entity: "user", .. })));
    }

    #[tokio::test]
    async fn test_create_includes_leader() {
        let leader = Uuid::new_v4();
        let member = Uuid::new_v4();
        let mut teams = MockTeamRepository::new();
        teams
            .expect_create()
            .withf(move |t| t.member_ids == vec![leader, member])
            .times(1)
            .returning(|t| Ok(t.clone()));
        let mut users = MockUserRepository::new();
        users.expect_existing_ids().returning(|ids| Ok(ids));

        let input = NewTeam {
            name: "North".into(),
            leader_id: Some(leader),
            member_ids: vec![member],
        };
        TeamService::new(Arc::new(teams), Arc::new(users)).create(input).await.unwrap();
    }
}
