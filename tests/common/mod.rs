//! Table descriptors shared by the integration tests.

#![allow(dead_code)]

qx::table! {
    pub struct Users("public", "users") {
        uid, displayname, email, password, created_at
    }

    pub struct UserRoles("public", "user_roles") {
        urid, uid, role, cohort, created_at, updated_at
    }

    pub struct UserRolesApplicants("public", "user_roles_applicants") {
        urid, application, data
    }

    pub struct UserRolesStudents("public", "user_roles_students") {
        urid, team, data
    }

    pub struct CohortEnum("public", "cohort_enum") {
        cohort
    }
}
