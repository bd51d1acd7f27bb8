//! Embedded, idempotent schema migrations.
//!
//! Every statement is `CREATE ... IF NOT EXISTS` (or `ADD COLUMN IF NOT
//! EXISTS`), so running on every start is safe.

use sqlx::PgPool;

const SCHEMA: &[(&str, &str)] = &[
    ("core schema", "CREATE SCHEMA IF NOT EXISTS core"),
    ("banking schema", "CREATE SCHEMA IF NOT EXISTS banking"),
    ("leasing schema", "CREATE SCHEMA IF NOT EXISTS leasing"),
    ("core.region", r#"
        CREATE TABLE IF NOT EXISTS core.region (
            region_id SERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            display_order INTEGER NOT NULL DEFAULT 0,
            is_active BOOLEAN NOT NULL DEFAULT TRUE
        )
    "#),
    ("core.product_type", r#"
        CREATE TABLE IF NOT EXISTS core.product_type (
            product_type_id SERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            display_order INTEGER NOT NULL DEFAULT 0,
            is_active BOOLEAN NOT NULL DEFAULT TRUE
        )
    "#),
    ("core.project", r#"
        CREATE TABLE IF NOT EXISTS core.project (
            project_id SERIAL PRIMARY KEY,
            project_name TEXT NOT NULL UNIQUE,
            city TEXT,
            state CHAR(2),
            region_id INTEGER REFERENCES core.region(region_id),
            product_type_id INTEGER REFERENCES core.product_type(product_type_id),
            units INTEGER CHECK (units IS NULL OR units >= 0),
            stage TEXT,
            estimated_construction_start DATE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#),
    ("core.bank", r#"
        CREATE TABLE IF NOT EXISTS core.bank (
            bank_id SERIAL PRIMARY KEY,
            bank_name TEXT NOT NULL UNIQUE,
            city TEXT,
            state CHAR(2),
            hold_limit NUMERIC(18, 2),
            per_deal_limit NUMERIC(18, 2),
            notes TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#),
    ("core.person", r#"
        CREATE TABLE IF NOT EXISTS core.person (
            person_id SERIAL PRIMARY KEY,
            full_name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            title TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#),
    ("core.equity_partner", r#"
        CREATE TABLE IF NOT EXISTS core.equity_partner (
            equity_partner_id SERIAL PRIMARY KEY,
            partner_name TEXT NOT NULL UNIQUE,
            partner_type TEXT CHECK (partner_type IN ('Entity', 'Individual')),
            contact_person_id INTEGER REFERENCES core.person(person_id),
            notes TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#),
    ("banking.loan_type", r#"
        CREATE TABLE IF NOT EXISTS banking.loan_type (
            loan_type_id SERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            display_order INTEGER NOT NULL DEFAULT 0,
            is_active BOOLEAN NOT NULL DEFAULT TRUE
        )
    "#),
    ("banking.loan", r#"
        CREATE TABLE IF NOT EXISTS banking.loan (
            loan_id SERIAL PRIMARY KEY,
            project_id INTEGER NOT NULL REFERENCES core.project(project_id),
            loan_type_id INTEGER REFERENCES banking.loan_type(loan_type_id),
            lender_id INTEGER REFERENCES core.bank(bank_id),
            financing_type TEXT,
            loan_amount NUMERIC(18, 2),
            loan_closing_date DATE,
            maturity_date DATE,
            fixed_or_floating TEXT CHECK (fixed_or_floating IN ('Fixed', 'Floating')),
            index_name TEXT,
            spread NUMERIC(9, 4),
            interest_rate NUMERIC(9, 4),
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            dscr_requirement NUMERIC(9, 4),
            dscr_test_date DATE,
            occupancy_requirement NUMERIC(9, 4),
            occupancy_test_date DATE,
            notes TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#),
    ("banking.participation", r#"
        CREATE TABLE IF NOT EXISTS banking.participation (
            participation_id SERIAL PRIMARY KEY,
            loan_id INTEGER NOT NULL REFERENCES banking.loan(loan_id),
            bank_id INTEGER NOT NULL REFERENCES core.bank(bank_id),
            exposure_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (exposure_amount >= 0),
            participation_percent NUMERIC(9, 4),
            paid_off BOOLEAN NOT NULL DEFAULT FALSE,
            notes TEXT
        )
    "#),
    ("banking.guarantee", r#"
        CREATE TABLE IF NOT EXISTS banking.guarantee (
            guarantee_id SERIAL PRIMARY KEY,
            project_id INTEGER NOT NULL REFERENCES core.project(project_id),
            loan_id INTEGER REFERENCES banking.loan(loan_id),
            person_id INTEGER NOT NULL REFERENCES core.person(person_id),
            guarantee_percent NUMERIC(9, 4) CHECK (guarantee_percent IS NULL OR guarantee_percent BETWEEN 0 AND 100),
            guarantee_amount NUMERIC(18, 2),
            notes TEXT
        )
    "#),
    ("banking.guarantee_burndown", r#"
        CREATE TABLE IF NOT EXISTS banking.guarantee_burndown (
            burndown_id SERIAL PRIMARY KEY,
            guarantee_id INTEGER NOT NULL REFERENCES banking.guarantee(guarantee_id),
            burndown_date DATE NOT NULL,
            remaining_percent NUMERIC(9, 4),
            remaining_amount NUMERIC(18, 2),
            notes TEXT
        )
    "#),
    ("banking.covenant", r#"
        CREATE TABLE IF NOT EXISTS banking.covenant (
            covenant_id SERIAL PRIMARY KEY,
            project_id INTEGER NOT NULL REFERENCES core.project(project_id),
            loan_id INTEGER REFERENCES banking.loan(loan_id),
            covenant_type TEXT NOT NULL,
            requirement TEXT,
            threshold NUMERIC(18, 4),
            compliance_date DATE,
            is_completed BOOLEAN NOT NULL DEFAULT FALSE,
            reminder_email TEXT,
            reminder_days_before INTEGER CHECK (reminder_days_before IS NULL OR reminder_days_before >= 0),
            last_reminder_sent_at TIMESTAMPTZ,
            auto_synced BOOLEAN NOT NULL DEFAULT FALSE,
            notes TEXT
        )
    "#),
    ("banking.dscr_test", r#"
        CREATE TABLE IF NOT EXISTS banking.dscr_test (
            dscr_test_id SERIAL PRIMARY KEY,
            project_id INTEGER NOT NULL REFERENCES core.project(project_id),
            loan_id INTEGER REFERENCES banking.loan(loan_id),
            test_number INTEGER,
            test_date DATE,
            requirement NUMERIC(9, 4),
            projected_value NUMERIC(9, 4),
            actual_value NUMERIC(9, 4)
        )
    "#),
    ("banking.liquidity_requirement", r#"
        CREATE TABLE IF NOT EXISTS banking.liquidity_requirement (
            liquidity_requirement_id SERIAL PRIMARY KEY,
            project_id INTEGER NOT NULL REFERENCES core.project(project_id),
            loan_id INTEGER REFERENCES banking.loan(loan_id),
            total_amount NUMERIC(18, 2),
            lending_bank_amount NUMERIC(18, 2),
            notes TEXT
        )
    "#),
    ("banking.equity_commitment", r#"
        CREATE TABLE IF NOT EXISTS banking.equity_commitment (
            equity_commitment_id SERIAL PRIMARY KEY,
            project_id INTEGER NOT NULL REFERENCES core.project(project_id),
            equity_partner_id INTEGER REFERENCES core.equity_partner(equity_partner_id),
            equity_type TEXT,
            amount NUMERIC(18, 2),
            funding_date DATE,
            interest_rate NUMERIC(9, 4),
            notes TEXT
        )
    "#),
    ("banking.equity_commitment_related_party", r#"
        CREATE TABLE IF NOT EXISTS banking.equity_commitment_related_party (
            equity_commitment_id INTEGER NOT NULL REFERENCES banking.equity_commitment(equity_commitment_id),
            related_party_id INTEGER NOT NULL REFERENCES core.equity_partner(equity_partner_id),
            PRIMARY KEY (equity_commitment_id, related_party_id)
        )
    "#),
    ("banking.loan_proceeds", r#"
        CREATE TABLE IF NOT EXISTS banking.loan_proceeds (
            loan_proceeds_id SERIAL PRIMARY KEY,
            loan_id INTEGER NOT NULL REFERENCES banking.loan(loan_id),
            project_id INTEGER NOT NULL REFERENCES core.project(project_id),
            proceeds_date DATE,
            amount NUMERIC(18, 2),
            draw_number INTEGER,
            notes TEXT
        )
    "#),
    ("banking.loan_modification", r#"
        CREATE TABLE IF NOT EXISTS banking.loan_modification (
            loan_modification_id SERIAL PRIMARY KEY,
            loan_id INTEGER NOT NULL REFERENCES banking.loan(loan_id),
            project_id INTEGER NOT NULL REFERENCES core.project(project_id),
            modification_type TEXT,
            effective_date DATE,
            description TEXT
        )
    "#),
    ("banking.bank_target", r#"
        CREATE TABLE IF NOT EXISTS banking.bank_target (
            bank_target_id SERIAL PRIMARY KEY,
            bank_id INTEGER NOT NULL UNIQUE REFERENCES core.bank(bank_id),
            assets TEXT,
            contact_name TEXT,
            comments TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#),
    ("banking.banking_file", r#"
        CREATE TABLE IF NOT EXISTS banking.banking_file (
            banking_file_id SERIAL PRIMARY KEY,
            project_id INTEGER NOT NULL REFERENCES core.project(project_id),
            file_name TEXT NOT NULL,
            content_type TEXT,
            storage_key TEXT NOT NULL UNIQUE,
            size_bytes BIGINT NOT NULL DEFAULT 0,
            uploaded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#),
    ("banking.banking_contact_extension", r#"
        CREATE TABLE IF NOT EXISTS banking.banking_contact_extension (
            person_id INTEGER PRIMARY KEY REFERENCES core.person(person_id),
            role TEXT,
            is_banking_contact BOOLEAN NOT NULL DEFAULT TRUE,
            notes TEXT,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#),
    ("banking.app_settings", r#"
        CREATE TABLE IF NOT EXISTS banking.app_settings (
            setting_key TEXT PRIMARY KEY,
            setting_value TEXT,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#),
    ("leasing.sync_log", r#"
        CREATE TABLE IF NOT EXISTS leasing.sync_log (
            sync_log_id BIGSERIAL PRIMARY KEY,
            dataset TEXT NOT NULL,
            row_count INTEGER NOT NULL DEFAULT 0,
            data_hash TEXT,
            source TEXT NOT NULL CHECK (source IN ('push', 'domo')),
            status TEXT NOT NULL CHECK (status IN ('synced', 'skipped', 'failed')),
            message TEXT,
            synced_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#),
    ("leasing.sync_log index", r#"
        CREATE INDEX IF NOT EXISTS idx_sync_log_dataset ON leasing.sync_log (dataset, synced_at DESC)
    "#),
    ("leasing.dashboard_snapshot", r#"
        CREATE TABLE IF NOT EXISTS leasing.dashboard_snapshot (
            snapshot_id INTEGER PRIMARY KEY CHECK (snapshot_id = 1),
            payload JSONB NOT NULL,
            etag TEXT NOT NULL,
            built_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#),
];

/// Dataset tables share one shape: the source row kept whole as JSONB.
fn dataset_table_ddl(table: &str) -> [String; 2] {
    let index_name = table.replace('.', "_");
    [
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id BIGSERIAL PRIMARY KEY,
                property TEXT,
                payload JSONB NOT NULL,
                synced_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_{index_name}_property ON {table} (property)"),
    ]
}

/// Run all migrations.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running schema migrations...");

    for (name, sql) in SCHEMA {
        tracing::debug!(migration = name, "applying");
        sqlx::query(sql).execute(pool).await?;
    }

    for key in stoactl_core::leasing::DatasetKey::ALL {
        for sql in dataset_table_ddl(key.table()) {
            sqlx::query(&sql).execute(pool).await?;
        }
    }

    tracing::info!("Schema migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_statement_is_idempotent() {
        for (name, sql) in SCHEMA {
            assert!(sql.contains("IF NOT EXISTS"), "{name} is not idempotent");
        }
    }

    #[test]
    fn dataset_tables_get_property_index() {
        let [table, index] = dataset_table_ddl("leasing.unit_mix");
        assert!(table.contains("CREATE TABLE IF NOT EXISTS leasing.unit_mix"));
        assert!(index.contains("idx_leasing_unit_mix_property"));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn migrations_run_twice() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool");
        run(&pool).await.expect("first run");
        run(&pool).await.expect("second run");
    }
}
