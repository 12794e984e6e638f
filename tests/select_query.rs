mod common;

use std::sync::Arc;
use std::thread;

use common::*;
use pretty_assertions::assert_eq;
use qx::prelude::*;

fn s(text: &str) -> Value {
    Value::from(text)
}

#[test]
fn test_get_with_explicit_alias() {
    let base = SelectQuery::new();
    let field = base.from(&Users::new()).with_alias("123").get("abcde");
    assert_eq!(field.to_sql(), ("123.abcde".to_string(), vec![]));
}

#[test]
fn test_get_with_implicit_alias() {
    let base = SelectQuery::new();
    let q = base.from(&Users::new());
    let alias = q.get_alias();
    assert!(!alias.is_empty());
    assert_eq!(q.get("abcde").to_sql(), (format!("{alias}.abcde"), vec![]));
}

#[test]
fn test_with() {
    let applicants = {
        let u = Users::new().with_alias("u");
        let ur = UserRoles::new().with_alias("ur");
        let ura = UserRolesApplicants::new().with_alias("ura");
        Cte::new(
            "applicants",
            select([&u.uid, &ur.urid, &u.displayname, &u.email, &ura.application, &ura.data])
                .from(&u)
                .join(&ur, ur.uid.eq(&u.uid))
                .left_join(&ura, ura.urid.eq(&ur.urid))
                .filter([ur.role.eq_string("applicant")]),
        )
    };
    let students = {
        let u = Users::new().with_alias("u");
        let ur = UserRoles::new().with_alias("ur");
        let urs = UserRolesStudents::new().with_alias("urs");
        Cte::new(
            "students",
            select([&u.uid, &ur.urid, &u.displayname, &u.email, &urs.team, &urs.data])
                .from(&u)
                .join(&ur, ur.uid.eq(&u.uid))
                .left_join(&urs, urs.urid.eq(&ur.urid))
                .filter([ur.role.eq_string("student")]),
        )
    };
    let advisers = {
        let u = Users::new().with_alias("u");
        let ur = UserRoles::new().with_alias("ur");
        Cte::new(
            "advisers",
            select([&u.uid, &ur.urid, &u.displayname, &u.email])
                .from(&u)
                .join(&ur, ur.uid.eq(&u.uid))
                .filter([ur.role.eq_string("adviser")]),
        )
    };

    let stu1 = students.with_alias("stu1");
    let stu2 = students.with_alias("stu2");
    let q = SelectQuery::new()
        .with([&applicants, &students, &advisers])
        .select([
            applicants.get("displayname"),
            stu1.get("uid"),
            stu2.get("uid"),
            advisers.get("email"),
        ])
        .from(&applicants)
        .cross_join(&stu1)
        .join(&stu2, stu2.get("uid").eq(&stu1.get("uid")))
        .cross_join(&advisers);

    let want = String::new()
        + "WITH applicants AS"
        + " (SELECT u.uid, ur.urid, u.displayname, u.email, ura.application, ura.data"
        + " FROM public.users AS u JOIN public.user_roles AS ur ON ur.uid = u.uid"
        + " LEFT JOIN public.user_roles_applicants AS ura ON ura.urid = ur.urid"
        + " WHERE ur.role = $1)"
        + ", students AS"
        + " (SELECT u.uid, ur.urid, u.displayname, u.email, urs.team, urs.data"
        + " FROM public.users AS u JOIN public.user_roles AS ur ON ur.uid = u.uid"
        + " LEFT JOIN public.user_roles_students AS urs ON urs.urid = ur.urid"
        + " WHERE ur.role = $2)"
        + ", advisers AS"
        + " (SELECT u.uid, ur.urid, u.displayname, u.email"
        + " FROM public.users AS u JOIN public.user_roles AS ur ON ur.uid = u.uid"
        + " WHERE ur.role = $3)"
        + " SELECT applicants.displayname, stu1.uid, stu2.uid, advisers.email"
        + " FROM applicants"
        + " CROSS JOIN students AS stu1"
        + " JOIN students AS stu2 ON stu2.uid = stu1.uid"
        + " CROSS JOIN advisers";

    assert_eq!(q.to_sql(), (want, vec![s("applicant"), s("student"), s("adviser")]));
}

#[test]
fn test_select() {
    let base = SelectQuery::new();
    let u = Users::new().with_alias("u");
    let ur = UserRoles::new().with_alias("ur");

    let cases: Vec<(&str, SelectQuery, &str)> = vec![
        (
            "basic select",
            base.select([&u.uid, &u.displayname, &u.email]),
            "SELECT u.uid, u.displayname, u.email",
        ),
        (
            "multiple select calls accumulate",
            base.select([&u.uid]).select([&u.displayname]).select([&u.email]),
            "SELECT u.uid, u.displayname, u.email",
        ),
        (
            "column aliases",
            base.select([
                ur.urid.clone(),
                ur.cohort.clone(),
                ur.role.with_alias("user_role"),
                ur.created_at.with_alias("date_created"),
            ]),
            "SELECT ur.urid, ur.cohort, ur.role AS user_role, ur.created_at AS date_created",
        ),
        (
            "select distinct",
            base.select_distinct([&ur.urid, &ur.cohort]),
            "SELECT DISTINCT ur.urid, ur.cohort",
        ),
        (
            "select distinct on",
            base.select_distinct_on([&ur.urid, &ur.cohort])
                .select([&ur.urid, &ur.cohort, &ur.updated_at]),
            "SELECT DISTINCT ON (ur.urid, ur.cohort) ur.urid, ur.cohort, ur.updated_at",
        ),
    ];

    for (description, q, want) in cases {
        assert_eq!(q.to_sql(), (want.to_string(), vec![]), "{description}");
    }
}

#[test]
fn test_from() {
    let base = SelectQuery::new();

    // Fields of unaliased tables are qualified by table name.
    let u = Users::new();
    assert_eq!(
        base.from(&u).select([&u.uid]).to_sql().0,
        "SELECT users.uid FROM public.users"
    );

    let u = Users::new().with_alias("u");
    assert_eq!(base.from(&u).to_sql().0, "FROM public.users AS u");
}

#[test]
fn test_all_join_kinds() {
    let base = SelectQuery::new();
    let u = Users::new().with_alias("u");
    let ur = UserRoles::new().with_alias("ur");

    // Joining the same alias repeatedly is invalid SQL; joins are kept as given.
    let q = base
        .from(&u)
        .join(&ur, ur.uid.eq(&u.uid))
        .left_join(&ur, ur.uid.eq(&u.uid))
        .right_join(&ur, ur.uid.eq(&u.uid))
        .full_join(&ur, ur.uid.eq(&u.uid))
        .cross_join(&ur);

    let want = String::new()
        + "FROM public.users AS u"
        + " JOIN public.user_roles AS ur ON ur.uid = u.uid"
        + " LEFT JOIN public.user_roles AS ur ON ur.uid = u.uid"
        + " RIGHT JOIN public.user_roles AS ur ON ur.uid = u.uid"
        + " FULL JOIN public.user_roles AS ur ON ur.uid = u.uid"
        + " CROSS JOIN public.user_roles AS ur";
    assert_eq!(q.to_sql(), (want, vec![]));
}

#[test]
fn test_join_subquery_with_explicit_alias() {
    let base = SelectQuery::new();
    let ur = UserRoles::new().with_alias("ur");
    let c = CohortEnum::new().with_alias("c");
    let latest_cohorts = select([&c.cohort])
        .from(&c)
        .filter([predicatef!("TRIM(?)::INT > ?", &c.cohort, 2020)])
        .with_alias("latest_cohorts");

    let q = base
        .from(&ur)
        .join(&latest_cohorts, latest_cohorts.get("cohort").eq(&ur.cohort));

    let want = String::new()
        + "FROM public.user_roles AS ur"
        + " JOIN (SELECT c.cohort FROM public.cohort_enum AS c WHERE TRIM(c.cohort)::INT > $1) AS latest_cohorts"
        + " ON latest_cohorts.cohort = ur.cohort";
    assert_eq!(q.to_sql(), (want, vec![Value::Int(2020)]));
}

#[test]
fn test_join_subquery_with_implicit_alias() {
    let base = SelectQuery::new();
    let ur = UserRoles::new().with_alias("ur");
    let c = CohortEnum::new().with_alias("c");
    let latest_cohorts = select([&c.cohort])
        .from(&c)
        .filter([predicatef!("TRIM(?)::INT > ?", &c.cohort, 2020)]);
    let alias = latest_cohorts.get_alias();
    assert!(!alias.is_empty());

    let q = base
        .from(&ur)
        .join(&latest_cohorts, latest_cohorts.get("cohort").eq(&ur.cohort));

    let want = format!(
        "FROM public.user_roles AS ur \
         JOIN (SELECT c.cohort FROM public.cohort_enum AS c WHERE TRIM(c.cohort)::INT > $1) AS {alias} \
         ON {alias}.cohort = ur.cohort"
    );
    assert_eq!(q.to_sql(), (want, vec![Value::Int(2020)]));
}

#[test]
fn test_implicit_alias_materialized_at_compile_time() {
    let c = CohortEnum::new().with_alias("c");
    let sub = select([&c.cohort]).from(&c);
    assert_eq!(sub.alias(), None);

    let (sql, _) = SelectQuery::new().select([Field::named("cohort")]).from(&sub).to_sql();
    let alias = sub.alias().unwrap();
    assert_eq!(
        sql,
        format!("SELECT cohort FROM (SELECT c.cohort FROM public.cohort_enum AS c) AS {alias}")
    );
}

/// Predicate-clause cases shared by WHERE and HAVING.
fn predicate_cases() -> Vec<(&'static str, Vec<Predicate>, &'static str, Vec<Value>)> {
    let u = Users::new().with_alias("u");
    let u1 = Users::new().with_alias("u1");
    let u2 = Users::new().with_alias("u2");
    let basic = || {
        vec![
            u.uid.eq_int(22),
            u.displayname.ilike_string("%bob%"),
            u.email.is_not_null(),
        ]
    };

    vec![
        (
            "implicit and",
            basic(),
            "u.uid = $1 AND u.displayname ILIKE $2 AND u.email IS NOT NULL",
            vec![Value::Int(22), s("%bob%")],
        ),
        (
            "explicit and",
            vec![and(basic())],
            "u.uid = $1 AND u.displayname ILIKE $2 AND u.email IS NOT NULL",
            vec![Value::Int(22), s("%bob%")],
        ),
        (
            "explicit or",
            vec![or(basic())],
            "u.uid = $1 OR u.displayname ILIKE $2 OR u.email IS NOT NULL",
            vec![Value::Int(22), s("%bob%")],
        ),
        (
            "complex predicate",
            vec![
                u1.uid.eq_int(69),
                u1.displayname.like_string("%bob%"),
                u1.email.is_null(),
                or([
                    u2.uid.eq_int(420),
                    u2.displayname.ilike_string("%virgil%"),
                    u2.email.is_not_null(),
                ]),
            ],
            "u1.uid = $1 AND u1.displayname LIKE $2 AND u1.email IS NULL \
             AND (u2.uid = $3 OR u2.displayname ILIKE $4 OR u2.email IS NOT NULL)",
            vec![Value::Int(69), s("%bob%"), Value::Int(420), s("%virgil%")],
        ),
    ]
}

#[test]
fn test_where() {
    let base = SelectQuery::new();
    for (description, predicates, want, args) in predicate_cases() {
        assert_eq!(
            base.filter(predicates).to_sql(),
            (format!("WHERE {want}"), args),
            "{description}"
        );
    }
}

#[test]
fn test_having() {
    let base = SelectQuery::new();
    for (description, predicates, want, args) in predicate_cases() {
        assert_eq!(
            base.having(predicates).to_sql(),
            (format!("HAVING {want}"), args),
            "{description}"
        );
    }
}

#[test]
fn test_and_inside_or_is_parenthesized() {
    let u = Users::new().with_alias("u");
    let q = SelectQuery::new().filter([or([
        and([u.uid.eq_int(1), u.email.is_null()]),
        u.displayname.eq_string("bob"),
    ])]);
    assert_eq!(
        q.to_sql().0,
        "WHERE (u.uid = $1 AND u.email IS NULL) OR u.displayname = $2"
    );
}

#[test]
fn test_vacuous_where_is_omitted() {
    let u = Users::new().with_alias("u");
    let q = SelectQuery::new()
        .from(&u)
        .filter([and(Vec::<Predicate>::new()), or(Vec::<Predicate>::new())]);
    assert_eq!(q.to_sql(), ("FROM public.users AS u".to_string(), vec![]));
}

#[test]
fn test_group_by() {
    let u = Users::new().with_alias("u");
    let q = SelectQuery::new().group_by([&u.uid, &u.displayname, &u.email]);
    assert_eq!(q.to_sql(), ("GROUP BY u.uid, u.displayname, u.email".to_string(), vec![]));
}

#[test]
fn test_order_by() {
    let base = SelectQuery::new();
    let u = Users::new().with_alias("u");

    assert_eq!(
        base.select(Vec::<Field>::new())
            .order_by([&u.uid, &u.displayname, &u.email])
            .to_sql()
            .0,
        "ORDER BY u.uid, u.displayname, u.email"
    );

    let q = base.order_by([
        u.uid.clone(),
        u.uid.asc(),
        u.uid.desc(),
        u.uid.nulls_last(),
        u.uid.asc().nulls_first(),
        u.uid.desc().nulls_last(),
    ]);
    assert_eq!(
        q.to_sql().0,
        "ORDER BY u.uid, u.uid ASC, u.uid DESC, u.uid NULLS LAST, u.uid ASC NULLS FIRST, u.uid DESC NULLS LAST"
    );
}

#[test]
fn test_limit_offset() {
    let base = SelectQuery::new();
    assert_eq!(
        base.limit(10).offset(20).to_sql(),
        ("LIMIT $1 OFFSET $2".to_string(), vec![Value::UInt(10), Value::UInt(20)])
    );
    // Negative numbers are made positive.
    assert_eq!(
        base.limit(-22).offset(-34).to_sql(),
        ("LIMIT $1 OFFSET $2".to_string(), vec![Value::UInt(22), Value::UInt(34)])
    );
}

#[test]
fn test_full_statement_clause_order() {
    let u = Users::new().with_alias("u");
    let ur = UserRoles::new().with_alias("ur");
    let q = SelectQuery::new()
        .limit(5)
        .order_by([u.created_at.desc()])
        .having([fieldf!("COUNT(?)", &ur.urid).gt_value(1)])
        .group_by([&u.uid])
        .filter([ur.cohort.eq_string("2020")])
        .left_join(&ur, ur.uid.eq(&u.uid))
        .from(&u)
        .select([u.uid.clone(), fieldf!("COUNT(?)", &ur.urid).with_alias("roles")]);

    assert_eq!(
        q.to_sql(),
        (
            "SELECT u.uid, COUNT(ur.urid) AS roles FROM public.users AS u \
             LEFT JOIN public.user_roles AS ur ON ur.uid = u.uid \
             WHERE ur.cohort = $1 GROUP BY u.uid HAVING COUNT(ur.urid) > $2 \
             ORDER BY u.created_at DESC LIMIT $3"
                .to_string(),
            vec![s("2020"), Value::Int(1), Value::UInt(5)]
        )
    );
}

#[test]
fn test_cte_bodies_claim_lowest_placeholders() {
    let u = Users::new().with_alias("u");
    let recent = Cte::new(
        "recent",
        select([&u.uid]).from(&u).filter([u.created_at.gt_value("2020-01-01")]),
    );
    let q = SelectQuery::new()
        .filter([recent.get("uid").gt_value(100)])
        .from(&recent)
        .select([recent.get("uid")])
        .with([&recent])
        .limit(3);

    assert_eq!(
        q.to_sql(),
        (
            "WITH recent AS (SELECT u.uid FROM public.users AS u WHERE u.created_at > $1) \
             SELECT recent.uid FROM recent WHERE recent.uid > $2 LIMIT $3"
                .to_string(),
            vec![s("2020-01-01"), Value::Int(100), Value::UInt(3)]
        )
    );
}

/// Placeholder numbers in text order.
fn placeholders(sql: &str) -> Vec<usize> {
    let bytes = sql.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let digits: String = sql[i + 1..].chars().take_while(char::is_ascii_digit).collect();
            if !digits.is_empty() {
                found.push(digits.parse().unwrap());
                i += digits.len();
            }
        }
        i += 1;
    }
    found
}

fn nested_statement() -> SelectQuery {
    let u = Users::new().with_alias("u");
    let ur = UserRoles::new().with_alias("ur");
    let c = CohortEnum::new().with_alias("c");
    let cohorts = select([&c.cohort])
        .from(&c)
        .filter([predicatef!("TRIM(?)::INT BETWEEN ? AND ?", &c.cohort, 2018, 2021)]);
    let roles = Cte::new(
        "roles",
        select([&ur.uid, &ur.cohort]).from(&ur).filter([ur.role.in_values(["student", "adviser"])]),
    );
    let r = roles.with_alias("r");

    SelectQuery::new()
        .with([&roles])
        .select([&u.uid, &u.email])
        .from(&u)
        .join(&r, and([r.get("uid").eq(&u.uid), u.displayname.ne_value("")]))
        .join(&cohorts, cohorts.get("cohort").eq(&r.get("cohort")))
        .filter([
            u.email.ilike_string("%@example.com"),
            or([u.uid.lt_value(10), u.uid.in_query(&select([&ur.uid]).from(&ur).filter([ur.role.eq_string("admin")]))]),
        ])
        .limit(20)
        .offset(40)
}

#[test]
fn test_placeholders_are_sequential() {
    let (sql, args) = nested_statement().to_sql();
    let numbers = placeholders(&sql);
    assert_eq!(numbers, (1..=args.len()).collect::<Vec<_>>());
    assert_eq!(args.len(), 10);
    assert_eq!(args.first(), Some(&s("student")));
    assert_eq!(args.last(), Some(&Value::UInt(40)));
}

#[test]
fn test_compilation_is_deterministic() {
    let q = nested_statement();
    assert_eq!(q.to_sql(), q.to_sql());
}

#[test]
fn test_implicit_aliases_are_unique() {
    let c = CohortEnum::new().with_alias("c");
    let a = select([&c.cohort]).from(&c);
    let b = select([&c.cohort]).from(&c);
    let q = SelectQuery::new()
        .from(&a)
        .join(&b, b.get("cohort").eq(&a.get("cohort")));

    let (alias_a, alias_b) = (a.get_alias(), b.get_alias());
    assert_ne!(alias_a, alias_b);
    for alias in [&alias_a, &alias_b] {
        assert!(alias.starts_with("_q"));
        assert!(alias.chars().all(|ch| ch == '_' || ch.is_ascii_alphanumeric()));
    }
    let (sql, _) = q.to_sql();
    assert!(sql.contains(&format!(") AS {alias_a} JOIN (")));
    assert!(sql.ends_with(&format!(") AS {alias_b} ON {alias_b}.cohort = {alias_a}.cohort")));
}

#[test]
#[should_panic(expected = "give each its own with `with_alias`")]
fn test_derived_tables_sharing_a_prototype_alias_panic() {
    let c = CohortEnum::new().with_alias("c");
    let base = SelectQuery::new();
    let a = base.select([&c.cohort]).from(&c);
    let b = base.select([&c.cohort]).from(&c).limit(1);
    SelectQuery::new()
        .from(&a)
        .join(&b, b.get("cohort").eq(&a.get("cohort")))
        .to_sql();
}

#[test]
fn test_derived_tables_from_one_prototype_with_own_aliases() {
    let c = CohortEnum::new().with_alias("c");
    let base = SelectQuery::new();
    let a = base.select([&c.cohort]).from(&c).with_alias("a");
    let b = base.select([&c.cohort]).from(&c).limit(1).with_alias("b");
    let q = SelectQuery::new()
        .from(&a)
        .join(&b, b.get("cohort").eq(&a.get("cohort")));
    assert_eq!(
        q.to_sql(),
        (
            "FROM (SELECT c.cohort FROM public.cohort_enum AS c) AS a \
             JOIN (SELECT c.cohort FROM public.cohort_enum AS c LIMIT $1) AS b \
             ON b.cohort = a.cohort"
                .to_string(),
            vec![Value::UInt(1)]
        )
    );
}

#[test]
fn test_branches_from_shared_prototype_are_isolated() {
    let u = Users::new().with_alias("u");
    let base = select([&u.uid]).from(&u).filter([u.email.is_not_null()]);

    let left = base.filter([u.uid.eq_int(1)]).order_by([&u.uid]);
    let right = base.filter([u.displayname.eq_string("bob")]).limit(1);

    assert_eq!(
        base.to_sql().0,
        "SELECT u.uid FROM public.users AS u WHERE u.email IS NOT NULL"
    );
    assert_eq!(
        left.to_sql(),
        (
            "SELECT u.uid FROM public.users AS u WHERE u.email IS NOT NULL AND u.uid = $1 ORDER BY u.uid"
                .to_string(),
            vec![Value::Int(1)]
        )
    );
    assert_eq!(
        right.to_sql(),
        (
            "SELECT u.uid FROM public.users AS u WHERE u.email IS NOT NULL AND u.displayname = $1 LIMIT $2"
                .to_string(),
            vec![s("bob"), Value::UInt(1)]
        )
    );
}

#[test]
fn test_parallel_branches_are_isolated() {
    let u = Users::new().with_alias("u");
    let base = Arc::new(select([&u.uid]).from(&u));

    let handles: Vec<_> = (0..16i64)
        .map(|i| {
            let base = Arc::clone(&base);
            let uid = u.uid.clone();
            thread::spawn(move || {
                let branch = base.filter([uid.eq_int(i)]).limit(i);
                // Each branch also materializes the shared alias cell.
                let alias = base.get_alias();
                (i, alias, branch.to_sql())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first_alias = &results[0].1;
    for (i, alias, (sql, args)) in &results {
        assert_eq!(alias, first_alias);
        assert_eq!(
            sql,
            "SELECT u.uid FROM public.users AS u WHERE u.uid = $1 LIMIT $2"
        );
        assert_eq!(args, &vec![Value::Int(*i), Value::UInt(i.unsigned_abs())]);
    }
    assert_eq!(base.to_sql().0, "SELECT u.uid FROM public.users AS u");
}
