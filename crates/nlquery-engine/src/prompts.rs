//! Prompt templates and rendering
//!
//! Templates use `{name}` placeholders. `{{` and `}}` produce literal braces,
//! which the chart and map templates need for their JSON examples.

use std::collections::BTreeMap;
use thiserror::Error;

/// Schema description injected into query prompts when none is configured.
pub const DEFAULT_SCHEMA: &str = r#"TABLE terminals:
  uid TEXT PRIMARY KEY
  name TEXT NOT NULL - terminal name (e.g. "Rotterdam Europoort")
  city TEXT NOT NULL - city where terminal is located
  longitude REAL NOT NULL
  latitude REAL NOT NULL
  country TEXT NOT NULL - country name (e.g. "Netherlands", "Germany", "Italy")

TABLE operators:
  uid TEXT PRIMARY KEY
  name TEXT NOT NULL - rail freight operator company name

TABLE trains:
  uid TEXT PRIMARY KEY
  capacities_left INTEGER - 1=has capacity, 0=full
  departure_iso_weekday INTEGER - 1=Monday, 7=Sunday
  departure_time TEXT - HH:MM format
  departure_day TEXT - day name (e.g. "Wednesday")
  arrival_iso_weekday INTEGER
  arrival_time TEXT
  arrival_day TEXT
  total_distance REAL - km
  transit_label TEXT - human-readable transit time
  transit_hours REAL - total transit time in hours
  truck_emission_co2e_wtw_ton REAL - CO2 emissions if shipped by truck (tons)
  train_emission_co2e_wtw_ton REAL - CO2 emissions by train (tons)
  train_vs_truck_co2e_reduction_percent REAL - % CO2 saved vs truck
  route_hash_key TEXT - hash identifier for the route geometry
  from_terminal_uid TEXT REFERENCES terminals(uid)
  to_terminal_uid TEXT REFERENCES terminals(uid)
  from_terminal_name TEXT
  from_terminal_city TEXT
  from_terminal_country TEXT
  to_terminal_name TEXT
  to_terminal_city TEXT
  to_terminal_country TEXT
  distance REAL - segment distance in km
  transit_time_hours REAL - segment transit time
  sequence_number INTEGER - leg sequence in multi-stop routes
  operator_uid TEXT REFERENCES operators(uid)
  operator_name TEXT
  container20 INTEGER - 1=accepts 20ft containers
  container30 INTEGER
  container40 INTEGER
  container45 INTEGER
  swap_body INTEGER
  tank_container INTEGER
  semi_trailer INTEGER
  nikrasa INTEGER
  bulk INTEGER
  ro_la INTEGER - rolling highway (trucks on trains)
  hazardous_goods INTEGER"#;

pub const GENERATE_QUERY_TEMPLATE: &str = r#"You are a SQLite expert for a European intermodal rail freight database.

DATABASE SCHEMA:
{schema}

RULES:
- Write exactly one SQLite SELECT query. Never INSERT, UPDATE, DELETE, DROP or ALTER.
- Match text with LIKE and % wildcards; SQLite LIKE ignores ASCII case.
- Countries are stored by full name ("Germany", "Netherlands", "Italy", "France").
- For emissions questions use train_vs_truck_co2e_reduction_percent or the truck/train emission columns.
- Add LIMIT 50 unless the question asks for an aggregate.
- For "routes from X to Y" filter on from_terminal_city and to_terminal_city.
- Return useful columns: cities, countries, operator, distance, transit time, emissions.
- Return the bare query with no markdown code fences.

EXAMPLES:
Question: "Show trains from Rotterdam to Milan"
SQL: SELECT from_terminal_city, to_terminal_city, operator_name, departure_day, departure_time, arrival_day, arrival_time, transit_hours, distance, train_vs_truck_co2e_reduction_percent FROM trains WHERE from_terminal_city LIKE '%Rotterdam%' AND to_terminal_city LIKE '%Milan%' LIMIT 50

Question: "Which routes save the most CO2?"
SQL: SELECT from_terminal_city, from_terminal_country, to_terminal_city, to_terminal_country, operator_name, train_vs_truck_co2e_reduction_percent, truck_emission_co2e_wtw_ton, train_emission_co2e_wtw_ton FROM trains WHERE train_vs_truck_co2e_reduction_percent IS NOT NULL ORDER BY train_vs_truck_co2e_reduction_percent DESC LIMIT 20

Question: "List terminals in Germany"
SQL: SELECT name, city, country, latitude, longitude FROM terminals WHERE country LIKE '%Germany%' ORDER BY city

Question: {question}
SQL:"#;

pub const FIX_QUERY_TEMPLATE: &str = r#"You are a SQLite expert. The query below failed.
Return only the corrected SQL, with no explanation and no markdown.

DATABASE SCHEMA:
{schema}

FAILED SQL:
{query}

ERROR MESSAGE:
{error}

CORRECTED SQL:"#;

pub const NARRATIVE_TEMPLATE: &str = r#"You answer questions for a European rail freight logistics platform.
Write a clear, concise markdown summary of the query results below.

RULES:
- Present structured data as markdown tables.
- Point out the notable findings (fastest route, lowest emissions and so on).
- If there are no results, say that no results were found and suggest another question.
- Stay under 500 words.
- Mention CO2 savings when emission data is present.
- Use metric units (km, hours, tonnes).

Question: {question}

Query results:
{results}

Summary:"#;

pub const CHART_TEMPLATE: &str = r#"You are a data visualization expert. Build a chart configuration for the
rail freight query results below.

Return only JSON with this shape:
{{
  "chart_type": "bar" | "line" | "pie" | "scatter",
  "title": "descriptive chart title",
  "x_key": "column for the x axis",
  "y_key": "column for the y axis",
  "data": [array of row objects],
  "x_label": "readable x axis label",
  "y_label": "readable y axis label"
}}

Chart types:
- bar: comparing categories (routes, operators, countries)
- line: trends or ordered sequences
- pie: proportional breakdown
- scatter: correlation between two numeric values

Question: {question}

Query results:
{results}

JSON:"#;

pub const MAP_TEMPLATE: &str = r#"You are a geospatial data expert. Convert the terminal or route results below
into a GeoJSON FeatureCollection.

Return only JSON with this shape:
{{
  "type": "FeatureCollection",
  "features": [
    {{
      "type": "Feature",
      "geometry": {{
        "type": "Point",
        "coordinates": [longitude, latitude]
      }},
      "properties": {{
        "name": "terminal or city name",
        "description": "relevant details"
      }}
    }}
  ]
}}

Use Point features for terminals and LineString features joining origin and
destination for routes.

Question: {question}

Query results:
{results}

GeoJSON:"#;

/// Template rendering failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("prompt variable '{0}' was not provided")]
    MissingVariable(String),

    #[error("unbalanced brace at byte {0}")]
    UnbalancedBrace(usize),
}

/// Substitute `{name}` placeholders from `vars`.
///
/// # Errors
///
/// Returns `PromptError::MissingVariable` for a placeholder without a value
/// and `PromptError::UnbalancedBrace` for a lone `{` or `}`.
pub fn render(template: &str, vars: &BTreeMap<&'static str, String>) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
            offset += pos + 2;
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
            offset += pos + 2;
        } else if tail.starts_with('}') {
            return Err(PromptError::UnbalancedBrace(offset + pos));
        } else {
            let close = tail
                .find('}')
                .ok_or(PromptError::UnbalancedBrace(offset + pos))?;
            let name = &tail[1..close];
            let value = vars
                .get(name)
                .ok_or_else(|| PromptError::MissingVariable(name.to_string()))?;
            out.push_str(value);
            rest = &tail[close + 1..];
            offset += pos + close + 1;
        }
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> BTreeMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, (*v).to_string())).collect()
    }

    #[test]
    fn test_render_substitutes_and_unescapes() {
        let out = render("{{\"q\": \"{question}\"}}", &vars(&[("question", "why")])).unwrap();
        assert_eq!(out, "{\"q\": \"why\"}");
    }

    #[test]
    fn test_values_are_not_reinterpreted() {
        let out = render("{a}", &vars(&[("a", "{b} }}")])).unwrap();
        assert_eq!(out, "{b} }}");
    }

    #[test]
    fn test_missing_variable() {
        assert_eq!(
            render("{question}", &BTreeMap::new()),
            Err(PromptError::MissingVariable("question".to_string()))
        );
    }

    #[test]
    fn test_unbalanced_braces() {
        assert!(matches!(
            render("a } b", &BTreeMap::new()),
            Err(PromptError::UnbalancedBrace(2))
        ));
        assert!(matches!(
            render("a {open", &BTreeMap::new()),
            Err(PromptError::UnbalancedBrace(2))
        ));
    }

    #[test]
    fn test_all_templates_render_with_their_variables() {
        let all = vars(&[
            ("schema", DEFAULT_SCHEMA),
            ("question", "List terminals in Germany"),
            ("query", "SELECT 1"),
            ("error", "no such table: x"),
            ("results", "No results found."),
        ]);
        for template in [
            GENERATE_QUERY_TEMPLATE,
            FIX_QUERY_TEMPLATE,
            NARRATIVE_TEMPLATE,
            CHART_TEMPLATE,
            MAP_TEMPLATE,
        ] {
            let out = render(template, &all).unwrap();
            assert!(!out.contains("{question}"));
            assert!(!out.contains("{{"));
        }
    }

    #[test]
    fn test_chart_template_keeps_json_braces() {
        let out = render(
            CHART_TEMPLATE,
            &vars(&[("question", "q"), ("results", "r")]),
        )
        .unwrap();
        assert!(out.contains("{\n  \"chart_type\""));
    }
}
