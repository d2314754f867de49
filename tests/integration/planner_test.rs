use anyhow::Result;

use relopt::catalog::{Schema, Statistics};
use relopt::query::parser::ast::{Predicate, QueryModel, SelectList};
use relopt::query::planner::cost_model::CostModel;
use relopt::query::planner::{
    CartesianAvoidance, Heuristic, HeuristicKind, JoinReordering, OptimizationWarning, Optimizer, OptimizerConfig,
    ProjectionPushdown, SelectionPushdown,
};

#[path = "../common/mod.rs"]
mod common;
use common::{join_order, parse_ok};

const QUERIES: &[&str] = &[
    "SELECT * FROM T;",
    "SELECT NOME FROM PESSOA WHERE IDADE >= 18;",
    "SELECT A.X FROM A INNER JOIN B ON A.ID = B.A_ID WHERE B.Y > 10;",
    "SELECT A.X, C.Z FROM A INNER JOIN B ON A.ID = B.A_ID INNER JOIN C ON B.ID = C.B_ID \
     WHERE A.K = 1 AND C.Z LIKE 'X%' AND A.W = C.W AND (B.Q = 1 OR B.Q = 2);",
    "SELECT A.X FROM A INNER JOIN B ON A.ID = A.ID WHERE A.X = B.Y AND B.Z > 1;",
    "SELECT A.X FROM A INNER JOIN B ON A.ID = B.A_ID WHERE D.Q = 4 AND A.X + 1 > B.Y;",
];

#[test]
fn test_selection_pushdown_idempotent() -> Result<()> {
    for sql in QUERIES {
        let model = parse_ok(sql)?;
        let once = SelectionPushdown.optimize(&model);
        let twice = SelectionPushdown.optimize(&once);
        assert_eq!(once, twice, "selection push-down not idempotent for {}", sql);
    }
    Ok(())
}

#[test]
fn test_selection_pushdown_only_keeps_multi_table_predicates() -> Result<()> {
    for sql in QUERIES {
        let model = parse_ok(sql)?;
        let optimized = SelectionPushdown.optimize(&model);
        let tables = optimized.tables();
        for predicate in &optimized.where_clause {
            let refs = predicate.tables();
            let pushable = refs.len() == 1 && refs.iter().all(|t| tables.contains(t));
            assert!(!pushable, "{} should have been pushed down in {}", predicate, sql);
        }
    }
    Ok(())
}

/// Every qualified column the query reads must survive the pushed projection
fn assert_projection_superset(model: &QueryModel, optimized: &QueryModel) {
    let mut needed = Vec::new();
    if let SelectList::Columns(cols) = &model.select {
        needed.extend(cols.iter().cloned());
    }
    needed.extend(model.where_clause.columns().into_iter().cloned());
    for join in &model.joins {
        needed.extend(join.condition.columns().into_iter().cloned());
        needed.extend(join.access.pushed_selection.columns().into_iter().cloned());
    }
    needed.extend(model.from_access.pushed_selection.columns().into_iter().cloned());

    for col in needed {
        let Some(table) = col.table.as_deref() else { continue };
        let Some(access) = optimized.access_for(table) else { continue };
        assert!(
            access.pushed_projection.is_empty() || access.pushed_projection.contains(&col.name),
            "column {} missing from the projection of {}",
            col,
            table
        );
    }
}

#[test]
fn test_projection_pushdown_superset() -> Result<()> {
    for sql in QUERIES {
        let model = SelectionPushdown.optimize(&parse_ok(sql)?);
        let optimized = ProjectionPushdown::new().optimize(&model);
        assert_projection_superset(&model, &optimized);
    }
    Ok(())
}

#[test]
fn test_projection_pushdown_resolves_bare_columns_with_schema() -> Result<()> {
    let model = parse_ok("SELECT NOME, CURSOS.TITULO FROM ALUNOS INNER JOIN CURSOS ON ALUNOS.CURSO_ID = CURSOS.ID;")?;

    let rewrite = ProjectionPushdown::new().apply(&model);
    assert_eq!(rewrite.model, model);
    assert!(matches!(
        rewrite.warnings.as_slice(),
        [OptimizationWarning::UnresolvedColumn { column }] if column == "NOME"
    ));

    let schema = Schema::new()
        .with_table("ALUNOS", ["ID", "NOME", "CURSO_ID"])
        .with_table("CURSOS", ["ID", "TITULO"]);
    let optimized = ProjectionPushdown::with_schema(schema).optimize(&model);
    let alunos: Vec<&str> = optimized.from_access.pushed_projection.iter().map(String::as_str).collect();
    assert_eq!(alunos, vec!["CURSO_ID", "NOME"]);
    Ok(())
}

#[test]
fn test_cartesian_avoidance_vacuous_join_example() -> Result<()> {
    let model = parse_ok("SELECT A.X FROM A INNER JOIN B ON A.ID=A.ID WHERE A.X = B.Y AND B.Z > 1;")?;
    let optimized = CartesianAvoidance.optimize(&model);

    assert_eq!(optimized.joins[0].condition.to_string(), "A.ID = A.ID AND A.X = B.Y");
    assert_eq!(optimized.where_clause.to_string(), "B.Z > 1");
    Ok(())
}

#[test]
fn test_cartesian_avoidance_invariant_and_partition() -> Result<()> {
    for sql in QUERIES {
        let model = parse_ok(sql)?;
        let optimized = CartesianAvoidance.optimize(&model);

        for predicate in &optimized.where_clause {
            if let Predicate::Comparison(cmp) = predicate {
                if let Some((l, r)) = cmp.as_equi_join() {
                    let involved = optimized
                        .joins
                        .iter()
                        .any(|j| l.belongs_to(&j.table) || r.belongs_to(&j.table));
                    assert!(!involved, "{} should have moved into a join in {}", predicate, sql);
                }
            }
        }

        let first_product = optimized.joins.iter().position(|j| !j.has_condition());
        if let Some(pos) = first_product {
            assert!(optimized.joins[pos..].iter().all(|j| !j.has_condition()));
        }
    }
    Ok(())
}

#[test]
fn test_cartesian_avoidance_keeps_products_stable() -> Result<()> {
    let mut model = parse_ok(
        "SELECT * FROM A INNER JOIN B ON A.ID = B.ID INNER JOIN C ON A.ID = C.ID \
         INNER JOIN D ON A.ID = D.ID INNER JOIN E ON A.ID = E.ID;",
    )?;
    model.joins[0].condition = Default::default();
    model.joins[2].condition = Default::default();

    let optimized = CartesianAvoidance.optimize(&model);
    assert_eq!(join_order(&optimized), vec!["C", "E", "B", "D"]);
    Ok(())
}

#[test]
fn test_join_reordering_is_stable() -> Result<()> {
    let model = parse_ok(
        "SELECT * FROM A INNER JOIN B ON A.ID = B.ID INNER JOIN C ON A.ID = C.ID INNER JOIN D ON A.ID = D.ID;",
    )?;
    let optimized = JoinReordering::new().optimize(&model);
    assert_eq!(join_order(&optimized), vec!["B", "C", "D"]);

    // Equal scores stay in their original relative order after the sort
    let pushed = SelectionPushdown.optimize(&parse_ok(
        "SELECT * FROM A INNER JOIN B ON A.ID = B.ID INNER JOIN C ON A.ID = C.ID \
         INNER JOIN D ON A.ID = D.ID WHERE D.K = 1;",
    )?);
    let optimized = JoinReordering::new().optimize(&pushed);
    assert_eq!(join_order(&optimized), vec!["D", "B", "C"]);

    let cost_model = CostModel::new(None);
    let scores: Vec<u32> = optimized.joins.iter().map(|j| cost_model.score(&optimized, j)).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    Ok(())
}

#[test]
fn test_full_pipeline_with_statistics() -> Result<()> {
    let model = parse_ok(
        "SELECT ALUNOS.NOME FROM ALUNOS INNER JOIN CURSOS ON ALUNOS.CURSO_ID = CURSOS.ID \
         INNER JOIN NOTAS ON ALUNOS.ID = NOTAS.ALUNO_ID;",
    )?;
    let stats = Statistics::new().with_table("CURSOS", 100_000).with_table("NOTAS", 40);
    let config = OptimizerConfig::default().with_statistics(stats);

    let result = Optimizer::with_config(&config).optimize(&model);
    assert_eq!(join_order(&result.model), vec!["NOTAS", "CURSOS"]);
    assert_eq!(result.steps.len(), 4);

    let reorder = &result.steps[3];
    assert_eq!(reorder.heuristic, "join_reordering");
    assert!(reorder.notes.iter().any(|n| n == "join order: CURSOS, NOTAS -> NOTAS, CURSOS"));
    Ok(())
}

#[test]
fn test_pipeline_reports_warnings() -> Result<()> {
    let model = parse_ok("SELECT A.X FROM A INNER JOIN B ON A.ID = B.A_ID WHERE D.Q = 4 AND C.X = D.Y;")?;
    let result = Optimizer::new().optimize(&model);

    let warnings: Vec<&OptimizationWarning> = result.warnings().collect();
    assert!(warnings.iter().any(|w| matches!(w, OptimizationWarning::UnknownTable { table, .. } if table == "D")));
    assert!(warnings.iter().any(|w| matches!(w, OptimizationWarning::NoMatchingJoin { .. })));
    assert_eq!(result.model.where_clause.len(), 2);
    Ok(())
}

#[test]
fn test_custom_heuristic_order() -> Result<()> {
    let model = parse_ok("SELECT A.X FROM A INNER JOIN B ON A.ID = A.ID WHERE A.X = B.Y AND B.Z > 1;")?;

    // Cartesian avoidance first: the two-table equality becomes a join
    // condition before selection push-down sees it
    let config = OptimizerConfig::default()
        .with_heuristics(vec![HeuristicKind::CartesianAvoidance, HeuristicKind::SelectionPushdown]);
    let result = Optimizer::with_config(&config).optimize(&model);

    assert!(result.model.where_clause.is_empty());
    assert_eq!(result.model.joins[0].condition.len(), 2);
    assert_eq!(result.model.joins[0].access.pushed_selection.to_string(), "B.Z > 1");
    Ok(())
}
