use anyhow::Result;

use relopt::query::algebra::converter::{STAGE_FINAL, STAGE_JOIN, STAGE_PROJECTION, STAGE_SELECTION};
use relopt::query::algebra::{StepKind, convert, convert_detailed, execution_steps, query_stats, render_tree};
use relopt::query::planner::Optimizer;

#[path = "../common/mod.rs"]
mod common;
use common::parse_ok;

#[test]
fn test_join_selection_projection_example() -> Result<()> {
    let model = parse_ok("SELECT A.X FROM A INNER JOIN B ON A.ID = B.A_ID WHERE B.Y > 10;")?;
    let stages = convert_detailed(&model);

    assert_eq!(stages[STAGE_JOIN], "(A ⋈_{A.ID = B.A_ID} B)");
    assert_eq!(stages[STAGE_SELECTION], "σ_{B.Y > 10}((A ⋈_{A.ID = B.A_ID} B))");
    assert_eq!(stages[STAGE_PROJECTION], "π_{A.X}(σ_{B.Y > 10}((A ⋈_{A.ID = B.A_ID} B)))");
    assert_eq!(stages[STAGE_FINAL], convert(&model));
    Ok(())
}

#[test]
fn test_bare_select_all() -> Result<()> {
    let model = parse_ok("SELECT * FROM T;")?;
    assert_eq!(convert(&model), "T");

    let stages = convert_detailed(&model);
    assert!(stages.values().all(|expr| expr == "T"));
    Ok(())
}

#[test]
fn test_projection_is_outermost() -> Result<()> {
    let queries = [
        "SELECT A.X, B.Y FROM A INNER JOIN B ON A.ID = B.A_ID INNER JOIN C ON B.ID = C.B_ID WHERE C.Z = 'Q';",
        "SELECT NOME FROM PESSOA WHERE IDADE > 18 AND NOME LIKE 'A%';",
        "SELECT A.X FROM A INNER JOIN B ON A.ID = B.A_ID;",
    ];
    for sql in queries {
        let model = parse_ok(sql)?;
        let text = convert(&model);
        assert!(text.starts_with("π_{"), "projection must be outermost in {}", text);
        if model.has_where() {
            let inner = text.split_once("}(").map(|(_, rest)| rest).unwrap_or_default();
            assert!(inner.starts_with("σ_{"), "selection must sit right under the projection in {}", text);
        }
    }
    Ok(())
}

#[test]
fn test_joins_fold_left_deep() -> Result<()> {
    let model =
        parse_ok("SELECT * FROM A INNER JOIN B ON A.ID = B.A_ID INNER JOIN C ON B.ID = C.B_ID;")?;
    assert_eq!(convert(&model), "((A ⋈_{A.ID = B.A_ID} B) ⋈_{B.ID = C.B_ID} C)");
    Ok(())
}

#[test]
fn test_optimized_algebra_shows_pushed_work() -> Result<()> {
    let model = parse_ok("SELECT A.X FROM A INNER JOIN B ON A.ID = B.A_ID WHERE B.Y > 10;")?;
    let optimized = Optimizer::new().optimize(&model).model;

    assert_eq!(
        convert(&optimized),
        "π_{A.X}((π_{ID, X}(A) ⋈_{A.ID = B.A_ID} π_{A_ID, Y}(σ_{B.Y > 10}(B))))"
    );
    Ok(())
}

#[test]
fn test_explanation_of_optimized_plan() -> Result<()> {
    let model = parse_ok("SELECT A.X FROM A INNER JOIN B ON A.ID = B.A_ID WHERE B.Y > 10;")?;
    let optimized = Optimizer::new().optimize(&model).model;

    let kinds: Vec<StepKind> = execution_steps(&optimized).iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            StepKind::Scan,
            StepKind::Project,
            StepKind::Scan,
            StepKind::Select,
            StepKind::Project,
            StepKind::Join,
            StepKind::Project,
        ]
    );

    let stats = query_stats(&optimized);
    assert_eq!(stats.table_count, 2);
    assert!(!stats.has_filter);
    assert_eq!(stats.pushed_selections, 1);
    assert_eq!(stats.pushed_projections, 2);

    let tree = render_tree(&optimized);
    assert!(tree.starts_with("π A.X\n└── ⋈ A.ID = B.A_ID\n"));
    assert!(tree.contains("σ B.Y > 10"));
    Ok(())
}
