use crate::database::models::{Team, TeamMembership, TeamRole};
use crate::database::{SqliteDatabase, TeamDatabase, UserDatabase};
use crate::error::CommonError;
use crate::utils::generate_code;
use crate::EngineError;
use tracing::{info, warn};

/// How many characters a team join code carries.
const JOIN_CODE_LENGTH: usize = 8;

/// How many times to retry join-code generation before giving up.
const CODE_ISSUE_ATTEMPTS: usize = 5;

/// Owns team identity, rosters and join-code issuance.
///
/// Join codes are issued server-side with a uniqueness check against
/// existing codes; a client-guessed code is never trusted to be fresh.
#[derive(Debug, Clone)]
pub struct TeamRegistry {
    db: SqliteDatabase,
}

impl TeamRegistry {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }

    /// Creates a team with the captain as its first member, failing with
    /// `DuplicateName` when the name is taken. The join code is generated
    /// and collision-checked here; on collision a fresh code is tried.
    pub async fn create(
        &self,
        captain_id: &str,
        name: &str,
        country: &str,
    ) -> Result<Team, EngineError> {
        self.ensure_user(captain_id).await?;
        if self.db.get_team_by_name(name).await?.is_some() {
            return Err(CommonError::DuplicateName(name.to_string()).into());
        }

        for _ in 0..CODE_ISSUE_ATTEMPTS {
            let code = generate_code(JOIN_CODE_LENGTH);
            match self.db.create_team(name, captain_id, country, &code).await? {
                Some(team) => {
                    info!("Created team {} ({}) led by {}", team.name, team.team_id, captain_id);
                    return Ok(team);
                }
                None => {
                    // The insert hit a uniqueness conflict: either the name
                    // was taken in a race with another creator, or the code
                    // collided and a fresh one is worth trying.
                    if self.db.get_team_by_name(name).await?.is_some() {
                        return Err(CommonError::DuplicateName(name.to_string()).into());
                    }
                    warn!("Join code collision on {}, regenerating", code);
                }
            }
        }
        Err(EngineError::msg(
            "Unable to issue a unique join code after repeated attempts",
        ))
    }

    /// Adds a user to the team behind a join code.
    pub async fn join_by_code(
        &self,
        user_id: &str,
        code: &str,
    ) -> Result<TeamMembership, EngineError> {
        self.ensure_user(user_id).await?;
        let team = self
            .db
            .get_team_by_code(code)
            .await?
            .ok_or_else(|| CommonError::TeamNotFound(code.to_string()))?;

        if let Some(membership) = self
            .db
            .insert_member(team.team_id, user_id, TeamRole::Member)
            .await?
        {
            info!("User {} joined team {}", user_id, team.team_id);
            return Ok(membership);
        }

        // The guarded insert did nothing; work out which rule blocked it.
        if self.db.get_membership(team.team_id, user_id).await?.is_some() {
            return Err(CommonError::AlreadyMember(team.team_id).into());
        }
        if self.db.member_count(team.team_id).await? >= team.max_members {
            return Err(CommonError::TeamFull(team.team_id).into());
        }
        Err(CommonError::TeamNotFound(code.to_string()).into())
    }

    /// Removes a member from a team. Only the captain or the member themself
    /// may do this. The captain can only leave once every other member is
    /// gone (ownership transfer is a separate, explicit operation); a team
    /// whose last member leaves is archived rather than left dangling.
    pub async fn remove_member(
        &self,
        team_id: i64,
        user_id: &str,
        acting_user_id: &str,
    ) -> Result<(), EngineError> {
        let team = self
            .db
            .get_team(team_id)
            .await?
            .ok_or_else(|| CommonError::TeamNotFound(team_id.to_string()))?;
        let membership = self
            .db
            .get_membership(team_id, user_id)
            .await?
            .ok_or_else(|| {
                CommonError::NotPermitted(format!("{} is not a member of team {}", user_id, team_id))
            })?;

        if acting_user_id != user_id && acting_user_id != team.captain_id {
            return Err(CommonError::NotPermitted(format!(
                "only {} or the captain may remove them",
                user_id
            ))
            .into());
        }

        let roster_size = self.db.member_count(team_id).await?;
        if membership.role == TeamRole::Captain && roster_size > 1 {
            return Err(CommonError::LastMemberIsCaptain(team_id).into());
        }

        self.db.delete_membership(team_id, user_id).await?;
        info!("Removed {} from team {}", user_id, team_id);

        if roster_size == 1 {
            // That was the last member; a memberless team is invalid.
            self.db.archive_team(team_id).await?;
            info!("Archived empty team {}", team_id);
        }

        Ok(())
    }

    /// Retrieves a team by id.
    pub async fn get(&self, team_id: i64) -> Result<Team, EngineError> {
        self.db
            .get_team(team_id)
            .await?
            .ok_or_else(|| CommonError::TeamNotFound(team_id.to_string()).into())
    }

    /// The team's roster, captain first.
    pub async fn members(&self, team_id: i64) -> Result<Vec<TeamMembership>, EngineError> {
        self.get(team_id).await?;
        self.db.get_members(team_id).await
    }

    /// The roster size, counted from membership rows.
    pub async fn member_count(&self, team_id: i64) -> Result<i64, EngineError> {
        self.get(team_id).await?;
        self.db.member_count(team_id).await
    }

    async fn ensure_user(&self, user_id: &str) -> Result<(), EngineError> {
        self.db
            .get_user(user_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| CommonError::UserNotFound(user_id.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountService;

    async fn setup() -> (TeamRegistry, AccountService) {
        let db = SqliteDatabase::connect_in_memory().await.unwrap();
        (TeamRegistry::new(db.clone()), AccountService::new(db))
    }

    async fn seed_users(accounts: &AccountService, ids: &[&str]) {
        for id in ids {
            accounts.register(id, id).await.unwrap();
        }
    }

    #[tokio::test]
    async fn captain_is_first_member() {
        let (teams, accounts) = setup().await;
        seed_users(&accounts, &["cap"]).await;

        let team = teams.create("cap", "Night Owls", "SG").await.unwrap();
        assert_eq!(team.join_code.len(), JOIN_CODE_LENGTH);
        assert_eq!(team.max_members, 6);

        let members = teams.members(team.team_id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, "cap");
        assert_eq!(members[0].role, TeamRole::Captain);
    }

    #[tokio::test]
    async fn duplicate_team_name_is_rejected() {
        let (teams, accounts) = setup().await;
        seed_users(&accounts, &["cap", "other"]).await;
        teams.create("cap", "Night Owls", "SG").await.unwrap();

        let err = teams.create("other", "Night Owls", "MY").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<CommonError>(),
            Some(&CommonError::DuplicateName("Night Owls".to_string()))
        );
    }

    #[tokio::test]
    async fn joining_an_unknown_code_fails() {
        let (teams, accounts) = setup().await;
        seed_users(&accounts, &["alice"]).await;

        let err = teams.join_by_code("alice", "NOPE1234").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<CommonError>(),
            Some(&CommonError::TeamNotFound("NOPE1234".to_string()))
        );
    }

    #[tokio::test]
    async fn joining_twice_fails_with_already_member() {
        let (teams, accounts) = setup().await;
        seed_users(&accounts, &["cap", "alice"]).await;
        let team = teams.create("cap", "Night Owls", "SG").await.unwrap();

        teams.join_by_code("alice", &team.join_code).await.unwrap();
        let err = teams
            .join_by_code("alice", &team.join_code)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<CommonError>(),
            Some(&CommonError::AlreadyMember(team.team_id))
        );
    }

    #[tokio::test]
    async fn seventh_member_is_turned_away() {
        let (teams, accounts) = setup().await;
        let ids = ["cap", "m1", "m2", "m3", "m4", "m5", "late"];
        seed_users(&accounts, &ids).await;
        let team = teams.create("cap", "Night Owls", "SG").await.unwrap();

        for id in &ids[1..6] {
            teams.join_by_code(id, &team.join_code).await.unwrap();
        }
        assert_eq!(teams.member_count(team.team_id).await.unwrap(), 6);

        let err = teams
            .join_by_code("late", &team.join_code)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<CommonError>(),
            Some(&CommonError::TeamFull(team.team_id))
        );
    }

    #[tokio::test]
    async fn captain_cannot_leave_while_members_remain() {
        let (teams, accounts) = setup().await;
        seed_users(&accounts, &["cap", "alice"]).await;
        let team = teams.create("cap", "Night Owls", "SG").await.unwrap();
        teams.join_by_code("alice", &team.join_code).await.unwrap();

        let err = teams
            .remove_member(team.team_id, "cap", "cap")
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<CommonError>(),
            Some(&CommonError::LastMemberIsCaptain(team.team_id))
        );
    }

    #[tokio::test]
    async fn only_captain_or_self_may_remove() {
        let (teams, accounts) = setup().await;
        seed_users(&accounts, &["cap", "alice", "mallory"]).await;
        let team = teams.create("cap", "Night Owls", "SG").await.unwrap();
        teams.join_by_code("alice", &team.join_code).await.unwrap();
        teams.join_by_code("mallory", &team.join_code).await.unwrap();

        let err = teams
            .remove_member(team.team_id, "alice", "mallory")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommonError>(),
            Some(CommonError::NotPermitted(_))
        ));

        // The captain can remove members, and members can remove themselves.
        teams
            .remove_member(team.team_id, "alice", "cap")
            .await
            .unwrap();
        teams
            .remove_member(team.team_id, "mallory", "mallory")
            .await
            .unwrap();
        assert_eq!(teams.member_count(team.team_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn last_member_leaving_archives_the_team() {
        let (teams, accounts) = setup().await;
        seed_users(&accounts, &["cap"]).await;
        let team = teams.create("cap", "Night Owls", "SG").await.unwrap();

        teams.remove_member(team.team_id, "cap", "cap").await.unwrap();

        let archived = teams.get(team.team_id).await.unwrap();
        assert!(archived.archived);

        // An archived team's code no longer admits anyone.
        seed_users(&accounts, &["alice"]).await;
        let err = teams
            .join_by_code("alice", &team.join_code)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<CommonError>(),
            Some(&CommonError::TeamNotFound(team.join_code.clone()))
        );
    }
}
