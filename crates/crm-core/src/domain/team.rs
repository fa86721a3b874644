//! Sales team

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub leader_id: Option<Uuid>,
    pub member_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_team_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.len() < 2 || name.len() > 100 {
        return Err(DomainError::ValidationError(
            "Team name must be between 2 and 100 characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

impl Team {
    pub fn new(name: &str, leader_id: Option<Uuid>) -> Result<Self, DomainError> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: validate_team_name(name)?,
            leader_id,
            member_ids: leader_id.into_iter().collect(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rename(&mut self, name: &str) -> Result<(), DomainError> {
        self.name = validate_team_name(name)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_leader(&mut self, leader_id: Option<Uuid>) {
        if let Some(id) = leader_id {
            if !self.member_ids.contains(&id) {
                self.member_ids.push(id);
            }
        }
        self.leader_id = leader_id;
        self.updated_at = Utc::now();
    }

    /// Replaces the member list. The leader stays a member.
    pub fn set_members(&mut self, member_ids: Vec<Uuid>) {
        let mut members: Vec<Uuid> = Vec::with_capacity(member_ids.len() + 1);
        for id in self.leader_id.into_iter().chain(member_ids) {
            if !members.contains(&id) {
                members.push(id);
            }
        }
        self.member_ids = members;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leader_is_always_member() {
        let leader = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut team = Team::new("North", Some(leader)).unwrap();
        team.set_members(vec![other, other]);
        assert_eq!(team.member_ids, vec![leader, other]);
    }

    #[test]
    fn test_name_validation() {
        assert!(Team::new(" ", None).is_err());
    }
}
