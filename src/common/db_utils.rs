use sqlx::{Executor, Postgres};

use crate::common::error::AppError;
use crate::models::inventory::InventoryKey;

// ---
// Lock por chave de saldo
// ---
/// Serializa leitura-cálculo-escrita sobre (produto, bodega, país, lote).
///
/// `pg_advisory_xact_lock` vale até o fim da transação mais externa, então
/// transferências e anulações seguram o lock de cada perna até o commit.
/// Funciona mesmo quando ainda não existe linha em `inventory_records`.
pub(crate) async fn lock_inventory_key<'e, E>(
    executor: E,
    key: &InventoryKey,
) -> Result<(), AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(key.lock_token())
        .execute(executor)
        .await?;

    Ok(())
}

/// Tokens em ordem canônica (ordenados, sem repetição).
pub(crate) fn lock_order(keys: &[&InventoryKey]) -> Vec<String> {
    let mut tokens: Vec<String> = keys.iter().map(|key| key.lock_token()).collect();
    tokens.sort();
    tokens.dedup();
    tokens
}

/// Trava várias chaves de uma vez, sempre na mesma ordem.
///
/// Duas operações que tocam as mesmas chaves em sentidos opostos (A→B e B→A)
/// esperam uma pela outra em vez de entrar em deadlock. O lock é reentrante
/// dentro da transação, então o registrador pode travar a mesma chave de novo.
pub(crate) async fn lock_inventory_keys(
    conn: &mut sqlx::PgConnection,
    keys: &[&InventoryKey],
) -> Result<(), AppError> {
    for token in lock_order(keys) {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(token)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}
