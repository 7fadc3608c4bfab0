//! Shared fixtures for unit tests.

use crate::condition::Conditions;
use crate::schema::{ModelDef, Registry, RelationDef};
use crate::value::Value;

pub(crate) fn blog_registry() -> Registry {
    Registry::builder()
        .model(
            ModelDef::new("Blog", "blogs")
                .attributes(["name"])
                .has_many("articles", "Article"),
        )
        .model(
            ModelDef::new("Author", "authors")
                .attributes(["firstName", "lastName", "age"])
                .has_many("articles", "Article")
                .has_one("profile", "Profile"),
        )
        .model(
            ModelDef::new("Profile", "profiles")
                .attributes(["authorId", "bio"])
                .belongs_to("author", "Author"),
        )
        .model(
            ModelDef::new("Article", "articles")
                .attributes(["authorId", "blogId", "title", "views"])
                .belongs_to("author", "Author")
                .belongs_to("blog", "Blog")
                .has_many("comments", "Comment")
                .relation(RelationDef::many_many("tags", "Tag").inverse("articles"))
                .hook("popular", |_, value| {
                    Ok(if *value == Value::Bool(true) {
                        Conditions::new().gt("views", 1000)
                    } else {
                        Conditions::new().op("views", "<=", 1000)
                    })
                }),
        )
        .model(
            ModelDef::new("Comment", "comments")
                .attributes(["articleId", "authorId", "body", "score"])
                .belongs_to("article", "Article")
                .belongs_to("author", "Author"),
        )
        .model(ModelDef::new("Tag", "tags").attributes(["name"]))
        .build()
        .expect("blog registry")
}
