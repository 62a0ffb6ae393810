mod common;

use std::time::Duration;

use common::{customer, date, mother, setup_state};
use gym_members_api::{
    entity::{Customers, Guardians},
    tasks::{GuardianSweeper, SweepReport},
};
use sea_orm::{EntityTrait, PaginatorTrait};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn sweep_removes_guardians_of_adults_only() -> anyhow::Result<()> {
    let (state, _) = setup_state().await?;
    let grown = customer(
        &state,
        "Lucas Prado",
        date(2000, 6, 1),
        Some(mother("Vera Prado")),
        date(2015, 1, 1),
    )
    .await?;
    let young = customer(
        &state,
        "Nina Prado",
        date(2015, 1, 1),
        Some(mother("Vera Prado")),
        date(2020, 1, 1),
    )
    .await?;
    customer(&state, "Otto Prado", date(1970, 1, 1), None, date(2020, 1, 1)).await?;

    let sweeper = GuardianSweeper::new(state.orm.clone(), Duration::from_secs(3600));
    let report = sweeper.sweep_once(date(2024, 1, 1)).await?;
    assert_eq!(
        report,
        SweepReport {
            examined: 2,
            removed: 1,
            failed: 0,
        }
    );

    let grown = Customers::find_by_id(grown.id).one(&state.orm).await?.expect("customer");
    assert!(grown.guardian_id.is_none());
    let young = Customers::find_by_id(young.id).one(&state.orm).await?.expect("customer");
    assert!(young.guardian_id.is_some());
    assert_eq!(Guardians::find().count(&state.orm).await?, 1);

    let again = sweeper.sweep_once(date(2024, 1, 1)).await?;
    assert_eq!(again.examined, 1);
    assert_eq!(again.removed, 0);
    Ok(())
}

#[tokio::test]
async fn sweep_respects_the_birthday() -> anyhow::Result<()> {
    let (state, _) = setup_state().await?;
    customer(
        &state,
        "Paulo Sena",
        date(2006, 3, 15),
        Some(mother("Rita Sena")),
        date(2020, 1, 1),
    )
    .await?;

    let sweeper = GuardianSweeper::new(state.orm.clone(), Duration::from_secs(3600));
    assert_eq!(sweeper.sweep_once(date(2024, 3, 14)).await?.removed, 0);
    assert_eq!(sweeper.sweep_once(date(2024, 3, 15)).await?.removed, 1);
    Ok(())
}

#[tokio::test]
async fn run_sweeps_then_stops_on_cancel() -> anyhow::Result<()> {
    let (state, _) = setup_state().await?;
    customer(
        &state,
        "Quim Lopes",
        date(2000, 1, 1),
        Some(mother("Sara Lopes")),
        date(2010, 1, 1),
    )
    .await?;

    let shutdown = CancellationToken::new();
    let sweeper = GuardianSweeper::new(state.orm.clone(), Duration::from_secs(3600));
    let task = tokio::spawn(sweeper.run(shutdown.clone()));

    let mut remaining = 1;
    for _ in 0..50 {
        remaining = Guardians::find().count(&state.orm).await?;
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(remaining, 0);

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), task).await??;
    Ok(())
}

#[tokio::test]
async fn run_returns_immediately_when_already_cancelled() -> anyhow::Result<()> {
    let (state, _) = setup_state().await?;
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let sweeper = GuardianSweeper::new(state.orm.clone(), Duration::from_secs(3600));
    tokio::time::timeout(Duration::from_secs(1), sweeper.run(shutdown)).await?;
    Ok(())
}
