use crate::common::{TestApp, routes};

mod tags {
    use super::*;

    #[tokio::test]
    async fn default_tags_are_seeded_and_listed() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::TAGS).await;

        assert_eq!(res.status, 200);
        let tags = res.body.as_array().expect("tag list should be an array");
        assert_eq!(tags.len(), 3);
        let slugs: Vec<&str> = tags.iter().map(|t| t["slug"].as_str().unwrap()).collect();
        assert_eq!(slugs, vec!["breakfast", "lunch", "dinner"]);
        assert_eq!(tags[0]["color"], "#E26C2D");
    }

    #[tokio::test]
    async fn tag_detail_is_public() {
        let app = TestApp::spawn().await;
        let ids = app.tag_ids().await;

        let res = app.get_without_token(&routes::tag(ids[0])).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["name"], "Breakfast");
    }

    #[tokio::test]
    async fn unknown_tag_returns_404() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::tag(999_999)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod ingredients {
    use super::*;

    #[tokio::test]
    async fn name_filter_matches_case_insensitive_substrings() {
        let app = TestApp::spawn().await;
        app.seed_ingredient("Brown sugar", "g").await;
        app.seed_ingredient("Sugar", "g").await;
        app.seed_ingredient("Salt", "g").await;

        let res = app
            .get_without_token(&format!("{}?name=sug", routes::INGREDIENTS))
            .await;

        assert_eq!(res.status, 200);
        let rows = res.body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        // Ordered by name.
        assert_eq!(rows[0]["name"], "Brown sugar");
        assert_eq!(rows[1]["name"], "Sugar");
    }

    #[tokio::test]
    async fn like_wildcards_in_the_filter_are_literal() {
        let app = TestApp::spawn().await;
        app.seed_ingredient("Salt", "g").await;
        app.seed_ingredient("100% cocoa", "g").await;

        let res = app
            .get_without_token(&format!("{}?name=%25", routes::INGREDIENTS))
            .await;

        assert_eq!(res.status, 200);
        let rows = res.body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "100% cocoa");
    }

    #[tokio::test]
    async fn ingredient_detail_includes_the_unit() {
        let app = TestApp::spawn().await;
        let id = app.seed_ingredient("Milk", "ml").await;

        let res = app.get_without_token(&routes::ingredient(id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["measurement_unit"], "ml");
    }
}
