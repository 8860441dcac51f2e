pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_contents.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_contents.sql")),
				"tables/002_content_meta.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_content_meta.sql")),
				"tables/003_terms.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_terms.sql")),
				"tables/004_term_taxonomy.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_term_taxonomy.sql")),
				"tables/005_term_relationships.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_term_relationships.sql")),
				"tables/006_index_entries.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_index_entries.sql")),
				"tables/007_index_custom_fields.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_index_custom_fields.sql")),
				"tables/008_index_taxonomies.sql" =>
					out.push_str(include_str!("../../../sql/tables/008_index_taxonomies.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
