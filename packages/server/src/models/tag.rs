use serde::Serialize;

#[derive(Serialize, utoipa::ToSchema)]
pub struct TagResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Breakfast")]
    pub name: String,
    #[schema(example = "#E26C2D")]
    pub color: String,
    #[schema(example = "breakfast")]
    pub slug: String,
}

impl From<crate::entity::tag::Model> for TagResponse {
    fn from(m: crate::entity::tag::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            color: m.color,
            slug: m.slug,
        }
    }
}
