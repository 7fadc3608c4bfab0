use super::*;
use crate::compiler::{Compiled, Compiler};
use crate::condition::Conditions;
use crate::query::prepare_values_for_execution;
use crate::testing::blog_registry;

fn compile(model: &str, kind: StatementKind, options: QueryOptions) -> OrmResult<Compiled> {
    let registry = blog_registry();
    let components = Builder::for_model(&registry, model, kind)?
        .options(options)
        .build()?;
    Compiler::for_components(&components).compile(&components)
}

fn select(model: &str, conditions: Conditions) -> Compiled {
    let options = QueryOptions {
        conditions,
        ..Default::default()
    };
    compile(model, StatementKind::Select, options).unwrap()
}

/// WHERE clause of a select, or the empty string.
fn where_of(model: &str, conditions: Conditions) -> String {
    let sql = select(model, conditions).sql;
    match sql.split_once(" WHERE ") {
        Some((_, clause)) => clause.to_string(),
        None => String::new(),
    }
}

fn flat(compiled: &Compiled) -> Vec<Value> {
    prepare_values_for_execution(&compiled.params)
}

const ARTICLE_COLUMNS: &str = "`_`.`id`,`_`.`author_id`,`_`.`blog_id`,`_`.`title`,`_`.`views`";

#[test]
fn simple_select_scenario() {
    let compiled = select(
        "Article",
        Conditions::new().eq("authorId", 12).eq("blogId", 1).group(
            Conditions::new()
                .eq("title", vec!["A", "B"])
                .or()
                .eq("authorId", 1),
        ),
    );
    assert_eq!(
        compiled.sql,
        "SELECT `id`,`author_id`,`blog_id`,`title`,`views` FROM `articles` \
         WHERE `author_id` = ? AND `blog_id` = ? AND (`title` IN (?,?) OR `author_id` = ?)"
    );
    assert_eq!(
        flat(&compiled),
        vec![
            Value::Int(12),
            Value::Int(1),
            Value::from("A"),
            Value::from("B"),
            Value::Int(1)
        ]
    );
}

#[test]
fn list_values_arrayify_operators() {
    assert_eq!(
        where_of("Article", Conditions::new().eq("views", vec![1, 2, 3])),
        "`views` IN (?,?,?)"
    );
    assert_eq!(where_of("Article", Conditions::new().eq("views", vec![1])), "`views` = ?");
    assert_eq!(
        where_of("Article", Conditions::new().eq("views", Vec::<i64>::new())),
        "`views` IS NULL"
    );
    assert_eq!(
        where_of("Article", Conditions::new().ne("views", Vec::<i64>::new())),
        "`views` IS NOT NULL"
    );
    assert_eq!(
        where_of("Article", Conditions::new().ne("views", vec![1, 2])),
        "`views` NOT IN (?,?)"
    );
    assert_eq!(
        where_of("Article", Conditions::new().gt("views", vec![1, 2])),
        "`views` > ANY (?,?)"
    );
    let err = compile(
        "Article",
        StatementKind::Select,
        QueryOptions {
            conditions: Conditions::new().like("title", vec!["a%", "b%"]),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, OrmError::MalformedOption { .. }));
}

#[test]
fn null_values_become_null_tests() {
    assert_eq!(
        where_of("Article", Conditions::new().eq("title", Value::Null)),
        "`title` IS NULL"
    );
    assert_eq!(
        where_of("Article", Conditions::new().op("title", "is not null", Value::Null)),
        "`title` IS NOT NULL"
    );
    let err = compile(
        "Article",
        StatementKind::Select,
        QueryOptions {
            conditions: Conditions::new().gt("views", Value::Null),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, OrmError::MalformedOption { .. }));
}

#[test]
fn between_takes_two_bounds() {
    let compiled = select("Article", Conditions::new().op("views", "between", vec![1, 10]));
    assert!(compiled.sql.ends_with("WHERE `views` BETWEEN ? AND ?"), "{}", compiled.sql);
    assert_eq!(flat(&compiled), vec![Value::Int(1), Value::Int(10)]);

    let err = compile(
        "Article",
        StatementKind::Select,
        QueryOptions {
            conditions: Conditions::new().op("views", "between", vec![1, 2, 3]),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, OrmError::MalformedOption { .. }));
}

#[test]
fn empty_group_is_rejected() {
    let err = compile(
        "Article",
        StatementKind::Select,
        QueryOptions {
            conditions: Conditions::new().eq("views", 1).group(Conditions::new()),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, OrmError::EmptyConditionGroup));
}

#[test]
fn unknown_names_fail() {
    let registry = blog_registry();
    assert!(matches!(
        Builder::for_model(&registry, "Editor", StatementKind::Select),
        Err(OrmError::UnknownModel(_))
    ));

    let err = compile(
        "Article",
        StatementKind::Select,
        QueryOptions {
            conditions: Conditions::new().eq("editor/name", "x"),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, OrmError::UnknownRelation { .. }));

    let err = compile(
        "Article",
        StatementKind::Select,
        QueryOptions {
            conditions: Conditions::new().op("views", "=~", 1),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, OrmError::UnknownOperator(_)));
}

#[test]
fn conjunctive_belongs_to_is_inner_joined() {
    let compiled = select("Article", Conditions::new().gt("author/age", 30));
    assert_eq!(
        compiled.sql,
        format!(
            "SELECT {ARTICLE_COLUMNS} FROM `articles` AS `_` \
             INNER JOIN `authors` AS `author` ON `author`.`id` = `_`.`author_id` \
             WHERE `author`.`age` > ?"
        )
    );
}

#[test]
fn disjunctive_belongs_to_is_left_joined() {
    let compiled = select(
        "Article",
        Conditions::new().eq("title", "x").or().gt("author/age", 30),
    );
    assert_eq!(
        compiled.sql,
        format!(
            "SELECT {ARTICLE_COLUMNS} FROM `articles` AS `_` \
             LEFT JOIN `authors` AS `author` ON `author`.`id` = `_`.`author_id` \
             WHERE `_`.`title` = ? OR `author`.`age` > ?"
        )
    );
}

#[test]
fn null_test_through_relation_keeps_left_join() {
    let compiled = select("Article", Conditions::new().eq("author/age", Value::Null));
    assert!(compiled.sql.contains("LEFT JOIN `authors`"), "{}", compiled.sql);
}

#[test]
fn shared_relation_is_joined_once() {
    let compiled = select(
        "Article",
        Conditions::new()
            .gt("author/age", 30)
            .eq("author/firstName", "Ann")
            .eq("author/profile/bio", "hi"),
    );
    assert_eq!(compiled.sql.matches("JOIN `authors`").count(), 1, "{}", compiled.sql);
    assert_eq!(compiled.sql.matches("JOIN `profiles`").count(), 1, "{}", compiled.sql);
    assert!(compiled.sql.contains(
        "INNER JOIN `profiles` AS `author.profile` ON `author.profile`.`author_id` = `author`.`id`"
    ));
}

#[test]
fn has_many_single_condition_is_exists() {
    assert_eq!(
        where_of("Author", Conditions::new().eq("articles/title", "A")),
        "EXISTS (SELECT 1 FROM `articles` AS `articles` \
         WHERE `articles`.`author_id` = `_`.`id` AND `articles`.`title` = ?)"
    );
}

#[test]
fn has_many_conjunction_is_division() {
    let compiled = select(
        "Author",
        Conditions::new()
            .gt("age", 30)
            .eq("articles/title", "A")
            .gt("articles/views", 10),
    );
    assert_eq!(
        compiled.sql,
        "SELECT `_`.`id`,`_`.`first_name`,`_`.`last_name`,`_`.`age` FROM `authors` AS `_` \
         WHERE `_`.`age` > ? AND NOT EXISTS (SELECT 1 FROM \
         (SELECT 1 AS `k` UNION ALL SELECT 2) AS `articles.__conds` WHERE NOT EXISTS \
         (SELECT 1 FROM `articles` AS `articles` WHERE `articles`.`author_id` = `_`.`id` AND \
         ((`articles.__conds`.`k` = 1 AND `articles`.`title` = ?) OR \
         (`articles.__conds`.`k` = 2 AND `articles`.`views` > ?))))"
    );
    assert_eq!(
        flat(&compiled),
        vec![Value::Int(30), Value::from("A"), Value::Int(10)]
    );
    assert!(!compiled.sql.contains("JOIN"));
}

#[test]
fn has_many_disjunction_is_single_exists() {
    assert_eq!(
        where_of(
            "Author",
            Conditions::new().eq("articles/title", "A").or().gt("articles/views", 10)
        ),
        "EXISTS (SELECT 1 FROM `articles` AS `articles` \
         WHERE `articles`.`author_id` = `_`.`id` AND (`articles`.`title` = ? OR `articles`.`views` > ?))"
    );
}

#[test]
fn has_many_division_over_three_conditions() {
    let compiled = select(
        "Author",
        Conditions::new()
            .eq("articles/title", "A")
            .gt("articles/views", 10)
            .lt("articles/views", 100),
    );
    let clause = compiled.sql.split_once(" WHERE ").unwrap().1;
    assert_eq!(
        clause,
        "NOT EXISTS (SELECT 1 FROM \
         (SELECT 1 AS `k` UNION ALL SELECT 2 UNION ALL SELECT 3) AS `articles.__conds` \
         WHERE NOT EXISTS (SELECT 1 FROM `articles` AS `articles` \
         WHERE `articles`.`author_id` = `_`.`id` AND \
         ((`articles.__conds`.`k` = 1 AND `articles`.`title` = ?) OR \
         (`articles.__conds`.`k` = 2 AND `articles`.`views` > ?) OR \
         (`articles.__conds`.`k` = 3 AND `articles`.`views` < ?))))"
    );
    assert_eq!(
        flat(&compiled),
        vec![Value::from("A"), Value::Int(10), Value::Int(100)]
    );
}

const AUTHOR_ARTICLE_TITLE: &str = "EXISTS (SELECT 1 FROM `articles` AS `articles` \
     WHERE `articles`.`author_id` = `_`.`id` AND `articles`.`title` = ?)";

#[test]
fn and_binds_tighter_than_or_around_to_many_leaves() {
    // (A and age > 30) or B
    let compiled = select(
        "Author",
        Conditions::new()
            .eq("articles/title", "A")
            .gt("age", 30)
            .or()
            .eq("articles/title", "B"),
    );
    assert_eq!(
        compiled.sql.split_once(" WHERE ").unwrap().1,
        format!("({AUTHOR_ARTICLE_TITLE} AND `_`.`age` > ?) OR {AUTHOR_ARTICLE_TITLE}")
    );
    assert_eq!(
        flat(&compiled),
        vec![Value::from("A"), Value::Int(30), Value::from("B")]
    );

    // A or (age > 30 and B)
    let compiled = select(
        "Author",
        Conditions::new()
            .eq("articles/title", "A")
            .or()
            .gt("age", 30)
            .eq("articles/title", "B"),
    );
    assert_eq!(
        compiled.sql.split_once(" WHERE ").unwrap().1,
        format!("{AUTHOR_ARTICLE_TITLE} OR (`_`.`age` > ? AND {AUTHOR_ARTICLE_TITLE})")
    );
    assert!(!compiled.sql.contains("NOT EXISTS"));
    assert_eq!(
        flat(&compiled),
        vec![Value::from("A"), Value::Int(30), Value::from("B")]
    );
}

#[test]
fn and_runs_still_divide_within_a_disjunction() {
    let clause = where_of(
        "Author",
        Conditions::new()
            .gt("age", 30)
            .or()
            .eq("articles/title", "A")
            .eq("articles/title", "B"),
    );
    assert!(clause.starts_with("`_`.`age` > ? OR (NOT EXISTS (SELECT 1 FROM"), "{clause}");
    assert!(clause.contains("UNION ALL SELECT 2) AS `articles.__conds`"), "{clause}");
    assert!(clause.ends_with("))))"), "{clause}");
}

#[test]
fn single_valued_path_below_to_many_joins_inside_subquery() {
    assert_eq!(
        where_of("Blog", Conditions::new().gt("articles/author/age", 30)),
        "EXISTS (SELECT 1 FROM `articles` AS `articles` \
         LEFT JOIN `authors` AS `articles.author` ON `articles.author`.`id` = `articles`.`author_id` \
         WHERE `articles`.`blog_id` = `_`.`id` AND `articles.author`.`age` > ?)"
    );
}

#[test]
fn nested_to_many_paths_nest_semi_joins() {
    let clause = where_of("Blog", Conditions::new().gt("articles/comments/score", 5));
    assert_eq!(
        clause,
        "EXISTS (SELECT 1 FROM `articles` AS `articles` WHERE `articles`.`blog_id` = `_`.`id` AND \
         EXISTS (SELECT 1 FROM `comments` AS `articles.comments` \
         WHERE `articles.comments`.`article_id` = `articles`.`id` AND `articles.comments`.`score` > ?))"
    );
}

#[test]
fn many_many_by_key_uses_join_table() {
    assert_eq!(
        where_of("Article", Conditions::new().eq("tags", 5)),
        "EXISTS (SELECT 1 FROM `articles_tags` AS `tags.__join` \
         WHERE `tags.__join`.`article_id` = `_`.`id` AND `tags.__join`.`tag_id` = ?)"
    );
    assert_eq!(
        where_of("Article", Conditions::new().eq("tags", vec![1, 2])),
        "EXISTS (SELECT 1 FROM `articles_tags` AS `tags.__join` \
         WHERE `tags.__join`.`article_id` = `_`.`id` AND `tags.__join`.`tag_id` IN (?,?))"
    );
}

#[test]
fn many_many_conjunction_is_division() {
    let clause = where_of(
        "Article",
        Conditions::new().eq("tags/name", "rust").eq("tags/name", "sql"),
    );
    assert!(clause.starts_with("NOT EXISTS (SELECT 1 FROM (SELECT 1 AS `k` UNION ALL SELECT 2)"));
    assert!(clause.contains(
        "FROM `articles_tags` AS `tags.__join` INNER JOIN `tags` AS `tags` ON `tags`.`id` = `tags.__join`.`tag_id`"
    ));
    assert!(clause.contains("(`tags.__conds`.`k` = 1 AND `tags`.`name` = ?)"));
    assert!(clause.contains("(`tags.__conds`.`k` = 2 AND `tags`.`name` = ?)"));
}

#[test]
fn inverse_many_many_is_queryable() {
    assert_eq!(
        where_of("Tag", Conditions::new().eq("articles/title", "A")),
        "EXISTS (SELECT 1 FROM `articles_tags` AS `articles.__join` \
         INNER JOIN `articles` AS `articles` ON `articles`.`id` = `articles.__join`.`article_id` \
         WHERE `articles.__join`.`tag_id` = `_`.`id` AND `articles`.`title` = ?)"
    );
}

#[test]
fn relation_terminal_compares_keys() {
    assert_eq!(where_of("Article", Conditions::new().eq("author", 12)), "`author_id` = ?");
    let compiled = select(
        "Article",
        Conditions::new().eq("author", Value::Entity(vec![Value::Int(12)])),
    );
    assert_eq!(flat(&compiled), vec![Value::Int(12)]);
    assert_eq!(
        where_of("Author", Conditions::new().eq("profile", 3)),
        "`profile`.`id` = ?"
    );
}

#[test]
fn compound_attributes() {
    assert_eq!(
        where_of("Article", Conditions::new().eq("authorId,blogId", vec![1, 2])),
        "(`author_id` = ? AND `blog_id` = ?)"
    );
    assert_eq!(
        where_of(
            "Article",
            Conditions::new().eq("authorId,blogId", Value::list([[1, 2], [3, 4]]))
        ),
        "((`author_id` = ? AND `blog_id` = ?) OR (`author_id` = ? AND `blog_id` = ?))"
    );
    assert_eq!(
        where_of("Article", Conditions::new().ne("authorId,blogId", vec![1, 2])),
        "(`author_id` != ? OR `blog_id` != ?)"
    );
    let err = compile(
        "Article",
        StatementKind::Select,
        QueryOptions {
            conditions: Conditions::new().eq("authorId,blogId", vec![1, 2, 3]),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, OrmError::MalformedOption { .. }));
}

#[test]
fn attribute_hooks_expand() {
    assert_eq!(
        where_of("Article", Conditions::new().eq("popular", true)),
        "(`views` > ?)"
    );
    assert_eq!(
        where_of("Article", Conditions::new().eq("popular", false)),
        "(`views` <= ?)"
    );
    assert_eq!(
        where_of("Author", Conditions::new().eq("articles/popular", true)),
        "(EXISTS (SELECT 1 FROM `articles` AS `articles` \
         WHERE `articles`.`author_id` = `_`.`id` AND `articles`.`views` > ?))"
    );
}

#[test]
fn explicit_in_lists() {
    assert_eq!(
        where_of("Article", Conditions::new().in_list("id", [1, 2])),
        "`id` IN (?,?)"
    );
    assert_eq!(
        where_of("Article", Conditions::new().in_list("id", Vec::<i64>::new())),
        "1=0"
    );
    assert_eq!(
        where_of("Article", Conditions::new().not_in_list("id", Vec::<i64>::new())),
        "1=1"
    );
}

#[test]
fn column_comparison_joins_right_side() {
    let compiled = select(
        "Article",
        Conditions::new().compare_attributes("views", ">", "author/age"),
    );
    assert!(compiled.sql.contains("LEFT JOIN `authors` AS `author`"), "{}", compiled.sql);
    assert!(compiled.sql.ends_with("WHERE `_`.`views` > `author`.`age`"));
    assert!(flat(&compiled).is_empty());
}

#[test]
fn column_comparison_with_to_many_side() {
    assert_eq!(
        where_of("Author", Conditions::new().compare_attributes("articles/views", ">", "age")),
        "EXISTS (SELECT 1 FROM `articles` AS `articles` \
         WHERE `articles`.`author_id` = `_`.`id` AND `articles`.`views` > `_`.`age`)"
    );

    let options = QueryOptions {
        conditions: Conditions::new().compare_attributes("age", "<", "articles/views"),
        ..Default::default()
    };
    match compile("Author", StatementKind::Select, options).unwrap_err() {
        OrmError::MalformedOption { option, message } => {
            assert_eq!(option, "conditions");
            assert!(message.contains("left side"), "{message}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn explicit_exists_and_subquery() {
    let registry = blog_registry();
    let mut tags = Builder::for_model(&registry, "Tag", StatementKind::Select).unwrap();
    tags.options_mut().conditions = Conditions::new().eq("name", "rust");
    let tags = tags.build().unwrap();

    let clause = where_of("Article", Conditions::new().exists(tags.clone()));
    assert_eq!(
        clause,
        "EXISTS (SELECT `_`.`id`,`_`.`name` FROM `tags` AS `_` WHERE `_`.`name` = ?)"
    );

    let mut count = Components::new(StatementKind::Select);
    count.from = Some(Source::table("comments", "c"));
    count.aggregates.push(Aggregate {
        func: AggregateFunc::Count,
        column: None,
        distinct: false,
        alias: None,
    });
    let compiled = select("Article", Conditions::new().subquery(count, ">", 3));
    assert!(
        compiled
            .sql
            .ends_with("WHERE (SELECT COUNT(*) FROM `comments` AS `c`) > ?"),
        "{}",
        compiled.sql
    );
}

#[test]
fn fields_and_eager_loading() {
    let compiled = compile(
        "Article",
        StatementKind::Select,
        QueryOptions {
            fields: vec!["title".into()],
            with: vec!["author".into()],
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT `_`.`title` AS `title`,`author`.`id` AS `author.id`,\
         `author`.`first_name` AS `author.firstName`,`author`.`last_name` AS `author.lastName`,\
         `author`.`age` AS `author.age` FROM `articles` AS `_` \
         LEFT JOIN `authors` AS `author` ON `author`.`id` = `_`.`author_id`"
    );
}

#[test]
fn eager_loading_selects_each_level_once() {
    let compiled = compile(
        "Blog",
        StatementKind::Select,
        QueryOptions {
            with: vec!["articles".into(), "articles/author".into()],
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(compiled.sql.matches("AS `articles.id`").count(), 1);
    assert!(compiled.sql.contains("AS `articles.author.firstName`"));
    assert!(compiled.sql.contains(
        "LEFT JOIN `articles` AS `articles` ON `articles`.`blog_id` = `_`.`id` \
         LEFT JOIN `authors` AS `articles.author` ON `articles.author`.`id` = `articles`.`author_id`"
    ));
}

#[test]
fn eager_loading_needs_a_model() {
    let table = crate::schema::Table::new("logs").with_columns(["message"]);
    let mut builder = Builder::for_table(&table, StatementKind::Select);
    builder.options_mut().with = vec!["owner".into()];
    assert!(matches!(
        builder.build(),
        Err(OrmError::MalformedOption { option, .. }) if option == "with"
    ));
}

#[test]
fn ordering_and_paging() {
    let compiled = compile(
        "Article",
        StatementKind::Select,
        QueryOptions {
            order_by: vec!["-views".into(), "title ASC".into()],
            limit: Some(10),
            offset: Some(20),
            distinct: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(compiled.sql.starts_with("SELECT DISTINCT `id`"));
    assert!(
        compiled
            .sql
            .ends_with("FROM `articles` ORDER BY `views` DESC,`title` LIMIT 10 OFFSET 20")
    );

    let compiled = compile(
        "Article",
        StatementKind::Select,
        QueryOptions {
            order_by: vec!["author/age DESC".into()],
            offset: Some(5),
            ..Default::default()
        },
    )
    .unwrap();
    assert!(compiled.sql.contains("LEFT JOIN `authors` AS `author`"));
    assert!(compiled.sql.ends_with(
        "ORDER BY `author`.`age` DESC LIMIT 18446744073709551615 OFFSET 5"
    ));

    for options in [
        QueryOptions {
            order_by: vec!["title sideways".into()],
            ..Default::default()
        },
        QueryOptions {
            limit: Some(-1),
            ..Default::default()
        },
    ] {
        assert!(matches!(
            compile("Article", StatementKind::Select, options),
            Err(OrmError::MalformedOption { .. })
        ));
    }
}

#[test]
fn grouping_and_aggregates() {
    let compiled = compile(
        "Article",
        StatementKind::Select,
        QueryOptions {
            group_by: vec!["authorId".into()],
            aggregates: vec![
                AggregateSpec::count_all().alias("n"),
                AggregateSpec::sum("views").alias("total"),
                AggregateSpec::count("blogId").distinct(),
            ],
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT `author_id`,COUNT(*) AS `n`,SUM(`views`) AS `total`,COUNT(DISTINCT `blog_id`) \
         FROM `articles` GROUP BY `author_id`"
    );
}

#[test]
fn multi_row_insert_scenario() {
    let compiled = compile(
        "Article",
        StatementKind::Insert,
        QueryOptions {
            fields: vec!["blogId".into(), "title".into(), "authorId".into()],
            rows: vec![
                vec![Value::Int(1), Value::from("A"), Value::Int(10)],
                vec![Value::Int(1), Value::from("B"), Value::Int(11)],
                vec![Value::Int(2), Value::from("C"), Value::Int(12)],
            ],
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(
        compiled.sql,
        "INSERT INTO `articles` (`blog_id`,`title`,`author_id`) VALUES(?,?,?),(?,?,?),(?,?,?)"
    );
    assert_eq!(compiled.params.len(), 9);
    assert_eq!(compiled.params[3], Value::Int(1));
    assert_eq!(compiled.params[4], Value::from("B"));
}

#[test]
fn insert_from_assignments_and_shape_errors() {
    let compiled = compile(
        "Tag",
        StatementKind::Insert,
        QueryOptions {
            set: vec![("name".into(), Value::from("rust"))],
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(compiled.sql, "INSERT INTO `tags` (`name`) VALUES(?)");

    let bad_row = QueryOptions {
        fields: vec!["name".into()],
        rows: vec![vec![Value::from("a"), Value::from("b")]],
        ..Default::default()
    };
    let nothing = QueryOptions::default();
    let through_relation = QueryOptions {
        set: vec![("author/age".into(), Value::Int(1))],
        ..Default::default()
    };
    for options in [bad_row, nothing, through_relation] {
        assert!(matches!(
            compile("Tag", StatementKind::Insert, options),
            Err(OrmError::MalformedOption { .. })
        ));
    }
}

#[test]
fn update_scenario() {
    let compiled = compile(
        "Author",
        StatementKind::Update,
        QueryOptions {
            set: vec![("firstName".into(), Value::from("Foo"))],
            conditions: Conditions::new().ne("id", 12).eq("lastName", "Bar"),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(
        compiled.sql,
        "UPDATE `authors` SET `first_name` = ? WHERE `id` != ? AND `last_name` = ?"
    );
    assert_eq!(
        flat(&compiled),
        vec![Value::from("Foo"), Value::Int(12), Value::from("Bar")]
    );
}

#[test]
fn multi_table_update() {
    let compiled = compile(
        "Article",
        StatementKind::Update,
        QueryOptions {
            set: vec![("title".into(), Value::from("x"))],
            conditions: Conditions::new().gt("author/age", 30),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(
        compiled.sql,
        "UPDATE `articles` AS `_` INNER JOIN `authors` AS `author` ON `author`.`id` = `_`.`author_id` \
         SET `_`.`title` = ? WHERE `author`.`age` > ?"
    );
    assert_eq!(flat(&compiled), vec![Value::from("x"), Value::Int(30)]);

    assert!(matches!(
        compile("Article", StatementKind::Update, QueryOptions::default()),
        Err(OrmError::MalformedOption { option, .. }) if option == "set"
    ));
}

#[test]
fn deletes() {
    let plain = compile(
        "Article",
        StatementKind::Delete,
        QueryOptions {
            conditions: Conditions::new().eq("id", 3),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(plain.sql, "DELETE FROM `articles` WHERE `id` = ?");

    let joined = compile(
        "Article",
        StatementKind::Delete,
        QueryOptions {
            conditions: Conditions::new().gt("author/age", 30),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(
        joined.sql,
        "DELETE FROM `_` USING `articles` AS `_` \
         INNER JOIN `authors` AS `author` ON `author`.`id` = `_`.`author_id` WHERE `author`.`age` > ?"
    );

    let correlated = compile(
        "Article",
        StatementKind::Delete,
        QueryOptions {
            conditions: Conditions::new().lt("comments/score", 0),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(
        correlated.sql,
        "DELETE FROM `_` USING `articles` AS `_` WHERE EXISTS (SELECT 1 FROM `comments` AS `comments` \
         WHERE `comments`.`article_id` = `_`.`id` AND `comments`.`score` < ?)"
    );
}
