/// Version of the `SQLite` table layout written to `tally_meta`.
pub const SCHEMA_VERSION: &str = "1";

/// Full SQL schema for Tally's `SQLite` database.
///
/// Extension answers are added later as nullable `TEXT` columns.
pub const SCHEMA_SQL: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS tally_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per submitted questionnaire, in insertion order
CREATE TABLE IF NOT EXISTS responses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    Conhecimento_PrEP TEXT NOT NULL,
    Conhecimento_PEP TEXT NOT NULL,
    Acesso_servicos TEXT NOT NULL,
    Fonte_informacao TEXT NOT NULL,
    Uso_PrepPEP TEXT NOT NULL,
    Conhece_usuarios TEXT NOT NULL,
    Teste_HIV_frequencia TEXT NOT NULL,
    Metodos_prevencao TEXT NOT NULL,
    Genero TEXT NOT NULL,
    Orientacao_sexual TEXT NOT NULL,
    Raca TEXT NOT NULL,
    Faixa_etaria TEXT NOT NULL,
    Renda TEXT NOT NULL,
    Regiao TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
";

/// `SQLite` PRAGMAs for durability.
pub const PRAGMAS_SQL: &str = r"
PRAGMA synchronous = FULL;
PRAGMA foreign_keys = ON;
";

/// Quote an identifier for use in dynamic SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
