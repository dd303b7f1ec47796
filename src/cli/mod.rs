use std::io::{self, BufRead, Write};

use sqlparser::ast::Statement;

use crate::{
    catalog::{defs::ColumnDescriptor, Introspector},
    core::{Datum, QueryResult, SQLError},
    domain::store,
    sql::{
        parser::parse_sql,
        session::{classify, StatementKind},
        Session,
    },
};

const HELP: &str = "\
\\dt          list tables
\\d <table>   describe a table
\\dT          list user-defined types
\\fk          list foreign keys
\\init        create the experiment tables
\\q           quit";

enum Outcome {
    Print(String),
    Quit,
}

pub struct CliApp<I: BufRead, O: Write> {
    session: Session,
    schema: String,

    input: I,
    output: O,
}

impl<I: BufRead, O: Write> CliApp<I, O> {
    pub fn new(session: Session, schema: impl Into<String>, input: I, output: O) -> Self {
        Self {
            session,
            schema: schema.into(),
            input,
            output,
        }
    }

    /// Reads lines until `\q` or end of input.
    pub async fn run(&mut self) -> io::Result<()> {
        self.bootstrap()?;

        let mut line_buf = String::new();
        loop {
            self.prompt()?;
            line_buf.clear();
            if self.input.read_line(&mut line_buf)? == 0 {
                break;
            }

            let outcome = self
                .handle_line(&line_buf)
                .await
                .unwrap_or_else(|e| Outcome::Print(e.to_string()));
            match outcome {
                Outcome::Print(text) if text.is_empty() => {}
                Outcome::Print(text) => {
                    self.print(&text)?;
                    self.print("\n")?;
                }
                Outcome::Quit => break,
            }
        }
        Ok(())
    }

    fn bootstrap(&mut self) -> io::Result<()> {
        let welcome = "Welcome to abadmin! Type \\? for help.\n";
        self.print(welcome)
    }

    fn prompt(&mut self) -> io::Result<()> {
        self.print("abadmin=# ")
    }

    async fn handle_line(&self, line: &str) -> Result<Outcome, SQLError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Outcome::Print(String::new()));
        }
        if let Some(command) = line.strip_prefix('\\') {
            return self.handle_meta(command).await;
        }

        // Text sqlparser cannot read (CREATE TYPE, typos) still goes to the
        // engine, routed by its leading keyword.
        let is_query = match parse_sql(line) {
            Ok(statement) => matches!(statement, Statement::Query(_)),
            Err(_) => classify(line) == StatementKind::Read,
        };

        let output = if is_query {
            format_result(&self.session.execute(line).await?)
        } else {
            let affected = self.session.execute_write(line).await?;
            format!("OK, {} row(s) affected", affected)
        };
        Ok(Outcome::Print(output))
    }

    async fn handle_meta(&self, command: &str) -> Result<Outcome, SQLError> {
        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or("");
        let argument = words.next();
        let introspector = Introspector::new(&self.session, self.schema.as_str());

        let output = match (name, argument) {
            ("q", _) => return Ok(Outcome::Quit),
            ("?", _) => HELP.to_string(),
            ("dt", _) => {
                let tables = introspector.list_tables().await?;
                if tables.is_empty() {
                    format!("No tables in schema {}.", introspector.schema())
                } else {
                    tables.join("\n")
                }
            }
            ("d", Some(table)) => {
                let columns = introspector.table_columns(table).await?;
                if columns.is_empty() {
                    format!("Did not find any table named {}.", table)
                } else {
                    format_columns(&columns)
                }
            }
            ("d", None) => "usage: \\d <table>".to_string(),
            ("dT", _) => {
                let types = introspector.user_defined_types().await?;
                if types.is_empty() {
                    "No user-defined types.".to_string()
                } else {
                    lines(types.iter())
                }
            }
            ("fk", _) => {
                let keys = introspector.foreign_keys().await?;
                if keys.is_empty() {
                    "No foreign keys.".to_string()
                } else {
                    lines(keys.iter())
                }
            }
            ("init", _) => {
                store::create_tables(&self.session).await?;
                "Created experiments, users and results.".to_string()
            }
            _ => format!("invalid command \\{}; try \\?", name),
        };
        Ok(Outcome::Print(output))
    }

    fn print(&mut self, string: &str) -> io::Result<()> {
        self.output.write_all(string.as_bytes())?;
        self.output.flush()
    }
}

fn lines<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items.map(|item| item.to_string()).collect::<Vec<_>>().join("\n")
}

fn format_columns(columns: &[ColumnDescriptor]) -> String {
    let header = ["column", "type", "nullable", "default", "primary key"]
        .iter()
        .map(|name| name.to_string())
        .collect::<Vec<_>>();
    let rows = columns
        .iter()
        .map(|column| {
            let data_type = match column.max_length {
                Some(length) => format!("{}({})", column.data_type, length),
                None => column.data_type.clone(),
            };
            vec![
                column.name.clone(),
                data_type,
                if column.nullable { "YES" } else { "NO" }.to_string(),
                column.default.clone().unwrap_or_default(),
                if column.is_primary_key { "YES" } else { "" }.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    format_table(&header, &rows)
}

/// Renders a result as an aligned table, or the engine's error.
pub fn format_result(result: &QueryResult) -> String {
    if let Some(error) = &result.error {
        return format!("ERROR: {}", error);
    }

    let rows = result
        .rows
        .iter()
        .map(|row| row.values().iter().map(Datum::to_string).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    format!(
        "{}\n({} row{})",
        format_table(&result.columns, &rows),
        rows.len(),
        if rows.len() == 1 { "" } else { "s" }
    )
}

fn format_table(header: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = header.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!(" {:<width$} ", cell, width = width))
            .collect::<Vec<_>>()
            .join("|")
            .trim_end()
            .to_string()
    };

    let mut out = vec![render(header)];
    out.push(
        widths
            .iter()
            .map(|width| "-".repeat(width + 2))
            .collect::<Vec<_>>()
            .join("+"),
    );
    out.extend(rows.iter().map(|row| render(row)));
    out.join("\n")
}
