use serde_json::json;

use crate::common::{TestApp, png_data_url, routes};

mod download {
    use super::*;

    #[tokio::test]
    async fn cart_downloads_as_a_pdf_attachment() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;
        let sugar = app.seed_ingredient("Sugar", "g").await;
        let egg = app.seed_ingredient("Egg", "pcs").await;

        // Two recipes sharing an ingredient, so the list has to sum amounts.
        let pancakes = app
            .create_recipe(&token, "Pancakes", &tags[..1], &[(salt, 2), (sugar, 5)])
            .await;
        let omelette = app
            .create_recipe(&token, "Omelette", &tags[..1], &[(salt, 3), (egg, 1)])
            .await;
        app.add_to_cart(pancakes, &token).await;
        app.add_to_cart(omelette, &token).await;

        let res = app.get_raw_with_token(routes::DOWNLOAD_CART, &token).await;

        assert_eq!(res.status(), 200);
        assert_eq!(
            res.headers()["content-type"].to_str().unwrap(),
            "application/pdf"
        );
        assert_eq!(
            res.headers()["content-disposition"].to_str().unwrap(),
            "attachment; filename=\"shopping_list.pdf\""
        );
        let bytes = res.bytes().await.unwrap();
        assert!(bytes.starts_with(b"%PDF"), "not a PDF document");
        assert!(bytes.len() > 500);
    }

    #[tokio::test]
    async fn empty_cart_still_yields_a_valid_document() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let res = app.get_raw_with_token(routes::DOWNLOAD_CART, &token).await;

        assert_eq!(res.status(), 200);
        let bytes = res.bytes().await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn recipes_with_images_render_thumbnails() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        let create = app
            .post_with_token(
                routes::RECIPES,
                &json!({
                    "name": "Pictured dish",
                    "text": "x",
                    "cooking_time": 15,
                    "tags": [tags[0]],
                    "ingredients": [{"id": salt, "amount": 1}],
                    "image": png_data_url(),
                }),
                &token,
            )
            .await;
        assert_eq!(create.status, 201, "{}", create.text);
        app.add_to_cart(create.id(), &token).await;

        let res = app.get_raw_with_token(routes::DOWNLOAD_CART, &token).await;

        assert_eq!(res.status(), 200);
        let bytes = res.bytes().await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn recipes_sharing_an_image_both_appear_in_the_gallery() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        // Identical bytes hash to the same stored blob, so both recipes end
        // up referencing one image. The gallery must still list them both.
        let mut ids = Vec::new();
        for name in ["Borscht", "Gazpacho"] {
            let res = app
                .post_with_token(
                    routes::RECIPES,
                    &json!({
                        "name": name,
                        "text": "Simmer until done.",
                        "cooking_time": 40,
                        "tags": [tags[0]],
                        "ingredients": [{"id": salt, "amount": 1}],
                        "image": png_data_url(),
                    }),
                    &token,
                )
                .await;
            assert_eq!(res.status, 201, "{}", res.text);
            ids.push(res.id());
            app.add_to_cart(res.id(), &token).await;
        }

        let res = app.get_raw_with_token(routes::DOWNLOAD_CART, &token).await;
        assert_eq!(res.status(), 200);
        let bytes = res.bytes().await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        // Link annotations store their target URL uncompressed, one per
        // gallery entry, so both recipe pages must show up in the raw bytes.
        let text = String::from_utf8_lossy(&bytes);
        for id in ids {
            assert!(
                text.contains(&format!("http://localhost/recipes/{id}")),
                "gallery is missing recipe {id}"
            );
        }
    }

    #[tokio::test]
    async fn cart_rows_with_deleted_recipes_are_skipped() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let tags = app.tag_ids().await;
        let salt = app.seed_ingredient("Salt", "g").await;

        let id = app
            .create_recipe(&alice, "Ephemeral", &tags[..1], &[(salt, 1)])
            .await;
        app.add_to_cart(id, &bob).await;

        let del = app.delete_with_token(&routes::recipe(id), &alice).await;
        assert_eq!(del.status, 204);

        let res = app.get_raw_with_token(routes::DOWNLOAD_CART, &bob).await;
        assert_eq!(res.status(), 200);
        let bytes = res.bytes().await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn download_requires_auth() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::DOWNLOAD_CART).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn banned_users_cannot_download() {
        let app = TestApp::spawn().await;
        let banned = app
            .create_user_with_role("troll", "securepass", "banned")
            .await;

        let res = app.get_with_token(routes::DOWNLOAD_CART, &banned).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}
