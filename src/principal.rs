use crate::{
    models::{Admin, Club, Profile},
    schema::*,
};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

/// Who is acting. An authenticated user resolves to exactly one of these, or
/// to nothing when neither record exists yet.
#[derive(Debug, Clone)]
pub enum Principal {
    Admin(Admin),
    Profile(Profile),
}

impl Principal {
    /// Admin records win over profiles for the same user id.
    pub async fn resolve(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> QueryResult<Option<Principal>> {
        if let Some(admin) = admins::table
            .filter(admins::user_id.eq(user_id))
            .first::<Admin>(conn)
            .await
            .optional()?
        {
            return Ok(Some(Principal::Admin(admin)));
        }

        Ok(profiles::table
            .find(user_id)
            .first::<Profile>(conn)
            .await
            .optional()?
            .map(Principal::Profile))
    }

    pub fn presides_over(&self, club: &Club) -> bool {
        matches!(self, Principal::Profile(p) if club.president_id == Some(p.id))
    }

    pub fn created(&self, club: &Club) -> bool {
        matches!(self, Principal::Admin(a) if club.created_by == a.id)
    }
}


#[cfg(test)]
mod tests {
    use super::{fixtures::*, *};

    #[test]
    fn president_is_matched_by_profile_id() {
        let admin = admin();
        let alice = profile("Alice");
        let bob = profile("Bob");
        let club = club(&admin, Some(&alice));

        assert!(Principal::Profile(alice).presides_over(&club));
        assert!(!Principal::Profile(bob).presides_over(&club));
        assert!(!Principal::Admin(admin).presides_over(&club));
    }

    #[test]
    fn only_the_creating_admin_owns_a_club() {
        let owner = admin();
        let other = admin();
        let club = club(&owner, None);

        assert!(Principal::Admin(owner).created(&club));
        assert!(!Principal::Admin(other).created(&club));
    }

    #[test]
    fn profile_never_owns_a_club() {
        let owner = admin();
        let mut student = profile("Alice");
        // same uuid as the admin row must still not count
        student.id = owner.id;
        let club = club(&owner, None);
        assert!(!Principal::Profile(student).created(&club));
    }
}
