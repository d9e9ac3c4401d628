//! Ledger schema: chart of accounts, subjects, journal, subledgers, payments.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(REGISTRY_SQL).await?;
        db.execute_unprepared(JOURNAL_SQL).await?;
        db.execute_unprepared(SUBLEDGER_SQL).await?;
        db.execute_unprepared(PAYMENTS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const REGISTRY_SQL: &str = r"
CREATE TABLE chart_of_accounts (
    id UUID PRIMARY KEY,
    account_code VARCHAR(20) NOT NULL UNIQUE,
    account_name VARCHAR(200) NOT NULL,
    account_type VARCHAR(20) NOT NULL,
    parent_account_id UUID REFERENCES chart_of_accounts(id),
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_account_type CHECK (account_type IN (
        'asset', 'cash', 'receivable', 'payable', 'liability',
        'equity', 'revenue', 'expense', 'contra_asset'
    ))
);

CREATE TABLE clients (
    id UUID PRIMARY KEY,
    name VARCHAR(200) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE suppliers (
    id UUID PRIMARY KEY,
    name VARCHAR(200) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE period_closings (
    id UUID PRIMARY KEY,
    closed_through DATE NOT NULL UNIQUE,
    closed_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    note TEXT
);
";

const JOURNAL_SQL: &str = r"
CREATE SEQUENCE journal_entry_number_seq;

CREATE TABLE journal_entries (
    id UUID PRIMARY KEY,
    entry_number VARCHAR(20) NOT NULL UNIQUE
        DEFAULT ('JE-' || lpad(nextval('journal_entry_number_seq')::text, 6, '0')),
    entry_date DATE NOT NULL,
    reference VARCHAR(100) NOT NULL,
    description TEXT NOT NULL,
    reference_type VARCHAR(30),
    reference_id UUID,
    idempotency_key VARCHAR(200),
    total_debit NUMERIC(19, 4) NOT NULL,
    total_credit NUMERIC(19, 4) NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'posted',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_journal_entries_idempotency_key UNIQUE (idempotency_key),
    CONSTRAINT chk_journal_totals CHECK (
        total_debit > 0 AND abs(total_debit - total_credit) <= 0.01
    )
);

CREATE INDEX idx_journal_entries_date ON journal_entries(entry_date);
CREATE INDEX idx_journal_entries_reference ON journal_entries(reference_type, reference_id);

CREATE TABLE journal_entry_lines (
    id UUID PRIMARY KEY,
    journal_entry_id UUID NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    line_number INTEGER NOT NULL,
    account_id UUID NOT NULL REFERENCES chart_of_accounts(id),
    debit_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    description TEXT,
    CONSTRAINT uq_journal_line_number UNIQUE (journal_entry_id, line_number),
    CONSTRAINT chk_line_one_side CHECK (
        (debit_amount > 0 AND credit_amount = 0) OR (debit_amount = 0 AND credit_amount > 0)
    )
);

CREATE INDEX idx_journal_lines_account ON journal_entry_lines(account_id);
";

const SUBLEDGER_SQL: &str = r"
CREATE TABLE account_ledger (
    id BIGSERIAL PRIMARY KEY,
    subject_id UUID NOT NULL REFERENCES chart_of_accounts(id),
    entry_date DATE NOT NULL,
    description TEXT NOT NULL,
    reference_type VARCHAR(30) NOT NULL,
    reference_id UUID NOT NULL,
    journal_entry_id UUID REFERENCES journal_entries(id),
    debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    running_balance NUMERIC(19, 4) NOT NULL,
    status VARCHAR(20) CHECK (status IN ('pending', 'confirmed')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_account_ledger_amounts CHECK (debit >= 0 AND credit >= 0)
);

CREATE INDEX idx_account_ledger_chain ON account_ledger(subject_id, entry_date, id);

CREATE TABLE client_ledger (
    id BIGSERIAL PRIMARY KEY,
    subject_id UUID NOT NULL REFERENCES clients(id),
    entry_date DATE NOT NULL,
    description TEXT NOT NULL,
    reference_type VARCHAR(30) NOT NULL,
    reference_id UUID NOT NULL,
    journal_entry_id UUID REFERENCES journal_entries(id),
    debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    running_balance NUMERIC(19, 4) NOT NULL,
    status VARCHAR(20) CHECK (status IN ('pending', 'confirmed')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_client_ledger_amounts CHECK (debit >= 0 AND credit >= 0)
);

CREATE INDEX idx_client_ledger_chain ON client_ledger(subject_id, entry_date, id);

CREATE TABLE supplier_ledger (
    id BIGSERIAL PRIMARY KEY,
    subject_id UUID NOT NULL REFERENCES suppliers(id),
    entry_date DATE NOT NULL,
    description TEXT NOT NULL,
    reference_type VARCHAR(30) NOT NULL,
    reference_id UUID NOT NULL,
    journal_entry_id UUID REFERENCES journal_entries(id),
    debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    running_balance NUMERIC(19, 4) NOT NULL,
    status VARCHAR(20) CHECK (status IN ('pending', 'confirmed')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_supplier_ledger_amounts CHECK (debit >= 0 AND credit >= 0)
);

CREATE INDEX idx_supplier_ledger_chain ON supplier_ledger(subject_id, entry_date, id);

-- One row per chain; locked FOR UPDATE to serialize appends
CREATE TABLE subledger_heads (
    kind VARCHAR(10) NOT NULL,
    subject_id UUID NOT NULL,
    current_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    entry_count BIGINT NOT NULL DEFAULT 0,
    last_entry_id BIGINT,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (kind, subject_id),
    CONSTRAINT chk_head_kind CHECK (kind IN ('account', 'client', 'supplier'))
);
";

const PAYMENTS_SQL: &str = r"
CREATE TABLE payments (
    id UUID PRIMARY KEY,
    direction VARCHAR(20) NOT NULL,
    subject_id UUID NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    payment_date DATE NOT NULL,
    method VARCHAR(30) NOT NULL,
    account_id UUID NOT NULL REFERENCES chart_of_accounts(id),
    status VARCHAR(20) NOT NULL DEFAULT 'in_pay',
    reference VARCHAR(100) NOT NULL,
    journal_entry_id UUID REFERENCES journal_entries(id),
    confirmed_at TIMESTAMPTZ,
    cancelled_at TIMESTAMPTZ,
    cancel_reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_payment_direction CHECK (direction IN ('receipt', 'disbursement')),
    CONSTRAINT chk_payment_status CHECK (status IN ('in_pay', 'confirmed', 'cancelled')),
    CONSTRAINT chk_payment_amount CHECK (amount > 0),
    CONSTRAINT chk_payment_confirmed CHECK (status <> 'confirmed' OR journal_entry_id IS NOT NULL)
);

CREATE INDEX idx_payments_status ON payments(status, direction, payment_date);
CREATE INDEX idx_payments_subject ON payments(subject_id);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS subledger_heads CASCADE;
DROP TABLE IF EXISTS supplier_ledger CASCADE;
DROP TABLE IF EXISTS client_ledger CASCADE;
DROP TABLE IF EXISTS account_ledger CASCADE;
DROP TABLE IF EXISTS journal_entry_lines CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP SEQUENCE IF EXISTS journal_entry_number_seq;
DROP TABLE IF EXISTS period_closings CASCADE;
DROP TABLE IF EXISTS suppliers CASCADE;
DROP TABLE IF EXISTS clients CASCADE;
DROP TABLE IF EXISTS chart_of_accounts CASCADE;
";
