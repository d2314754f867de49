use anyhow::Result;

use relopt::catalog::Schema;
use relopt::query::parser::ast::{ColumnRef, CompareOp, Predicate, SelectList};
use relopt::query::parser::{ParseError, Parser, parse};

#[path = "../common/mod.rs"]
mod common;
use common::parse_ok;

#[test]
fn test_join_count_matches_clauses() -> Result<()> {
    let sql = "SELECT ALUNOS.NOME, CURSOS.TITULO, TURMAS.SALA FROM ALUNOS \
               INNER JOIN MATRICULAS ON ALUNOS.ID = MATRICULAS.ALUNO_ID \
               INNER JOIN TURMAS ON MATRICULAS.TURMA_ID = TURMAS.ID \
               INNER JOIN CURSOS ON TURMAS.CURSO_ID = CURSOS.ID;";
    let model = parse_ok(sql)?;

    assert_eq!(model.joins.len(), 3);
    assert_eq!(common::join_order(&model), vec!["MATRICULAS", "TURMAS", "CURSOS"]);
    assert_eq!(
        model.select,
        SelectList::Columns(vec![
            ColumnRef::qualified("ALUNOS", "NOME"),
            ColumnRef::qualified("CURSOS", "TITULO"),
            ColumnRef::qualified("TURMAS", "SALA"),
        ])
    );
    assert!(model.where_clause.is_empty());
    Ok(())
}

#[test]
fn test_input_is_case_insensitive() -> Result<()> {
    let model = parse_ok("  select nome from pessoa where idade >= 18 ;  ")?;
    assert_eq!(model.from_table, "PESSOA");
    assert_eq!(model.where_clause.to_string(), "IDADE >= 18");
    Ok(())
}

#[test]
fn test_multiline_query() -> Result<()> {
    let model = parse_ok("SELECT A.X\nFROM A\nINNER JOIN B ON A.ID = B.A_ID\nWHERE B.Y > 10;")?;
    assert_eq!(model.joins.len(), 1);
    assert_eq!(model.where_clause.to_string(), "B.Y > 10");
    Ok(())
}

#[test]
fn test_rejection_categories() -> Result<()> {
    assert_eq!(parse("SELECT * FROM T"), Err(ParseError::MissingTerminator));
    assert_eq!(parse("DELETE FROM T;"), Err(ParseError::MissingSelect));
    assert_eq!(parse("SELECT * FROM T WHERE;"), Err(ParseError::EmptyWhere));
    assert_eq!(parse("SELECT * T;"), Err(ParseError::SyntaxError));

    let mixed = parse("SELECT *, A FROM T;").unwrap_err();
    assert!(matches!(mixed, ParseError::InvalidColumn { ref column, .. } if column == "*"));

    let join = parse("SELECT * FROM A INNER JOIN B ON A.ID > B.ID;").unwrap_err();
    assert!(matches!(join, ParseError::InvalidJoin { .. }));

    let join = parse("SELECT * FROM A INNER JOIN B ON ID = B.ID WHERE A.X = 1;").unwrap_err();
    assert!(matches!(join, ParseError::InvalidJoin { .. }));
    Ok(())
}

#[test]
fn test_error_messages_are_readable() {
    let err = parse("SELECT * FROM T").unwrap_err();
    assert!(err.to_string().contains("';'"));

    let err = parse("SELECT A B FROM T;").unwrap_err();
    assert!(err.to_string().contains("A B"));
}

#[test]
fn test_predicate_structure() -> Result<()> {
    let model = parse_ok(
        "SELECT * FROM A WHERE A.X = 1 AND (A.Y < 2 OR A.Z IS NULL) AND NOT A.W LIKE 'K%' AND A.V BETWEEN 1 AND 9;",
    )?;
    let conjuncts = &model.where_clause.0;
    assert_eq!(conjuncts.len(), 4);

    match &conjuncts[0] {
        Predicate::Comparison(cmp) => assert_eq!(cmp.op, CompareOp::Eq),
        other => panic!("Expected comparison, got {:?}", other),
    }
    assert!(matches!(conjuncts[1], Predicate::Or(_)));
    assert!(matches!(conjuncts[2], Predicate::Not(_)));
    match &conjuncts[3] {
        Predicate::Opaque { columns, .. } => assert_eq!(columns, &vec![ColumnRef::qualified("A", "V")]),
        other => panic!("Expected opaque predicate, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_schema_descriptor_from_json() -> Result<()> {
    let schema = Schema::from_json_str(
        r#"{"reserved_words": ["SELECT", "FROM", "NOME"], "tables": {"alunos": ["id", "nome"], "cursos": []}}"#,
    )?;
    let parser = Parser::with_schema(schema);

    // Custom reserved words replace the defaults
    assert!(matches!(
        parser.parse("SELECT NOME FROM ALUNOS;"),
        Err(ParseError::InvalidColumn { .. })
    ));
    assert!(parser.parse("SELECT ALUNOS.ID FROM ALUNOS;").is_ok());

    // A table listed without columns accepts any column
    assert!(parser.parse("SELECT CURSOS.QUALQUER FROM CURSOS;").is_ok());

    assert!(matches!(
        parser.parse("SELECT * FROM ALUNOS INNER JOIN PROFESSORES ON ALUNOS.ID = PROFESSORES.ID;"),
        Err(ParseError::InvalidTable { ref table, .. }) if table == "PROFESSORES"
    ));
    assert!(matches!(
        parser.parse("SELECT * FROM ALUNOS INNER JOIN CURSOS ON ALUNOS.CURSO = CURSOS.ID;"),
        Err(ParseError::InvalidJoin { .. })
    ));
    Ok(())
}

#[test]
fn test_model_serializes_to_json() -> Result<()> {
    let model = parse_ok("SELECT A.X FROM A INNER JOIN B ON A.ID = B.A_ID WHERE B.Y > 10;")?;
    let json = serde_json::to_string(&model)?;
    let back: relopt::QueryModel = serde_json::from_str(&json)?;
    assert_eq!(back, model);
    Ok(())
}
