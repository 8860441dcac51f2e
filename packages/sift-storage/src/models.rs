use time::OffsetDateTime;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ContentRecord {
	pub id: i64,
	pub site: i64,
	pub content_type: String,
	pub status: String,
	pub title: String,
	pub slug: String,
	pub excerpt: String,
	pub published_at: OffsetDateTime,
}
