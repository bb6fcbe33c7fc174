//! SQLite schema definition.

/// Complete database schema for the clinic core.
///
/// Money columns are TEXT holding a decimal string rounded to cents.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Staff
-- ============================================================================

CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    clinic_id TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    specialization TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    UNIQUE (clinic_id, user_id)
);

CREATE TABLE IF NOT EXISTS user_roles (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    clinic_id TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('clinic_admin', 'provider', 'reception', 'patient')),
    created_at TEXT NOT NULL,
    UNIQUE (clinic_id, user_id, role)
);

CREATE INDEX IF NOT EXISTS idx_user_roles_clinic ON user_roles(clinic_id, user_id);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    clinic_id TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    date_of_birth TEXT,
    gender TEXT CHECK (gender IN ('male', 'female', 'other')),
    blood_type TEXT,
    address TEXT,
    city TEXT,
    emergency_contact_name TEXT,
    emergency_contact_phone TEXT,
    emergency_contact_relation TEXT,
    notes TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_clinic ON patients(clinic_id, is_active);
CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(clinic_id, last_name, first_name);

CREATE TABLE IF NOT EXISTS patient_allergies (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    allergy_name TEXT NOT NULL,
    severity TEXT NOT NULL CHECK (severity IN ('mild', 'moderate', 'severe')),
    notes TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS patient_medications (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    medication_name TEXT NOT NULL,
    dosage TEXT,
    frequency TEXT,
    start_date TEXT,
    end_date TEXT,
    prescribing_doctor TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    notes TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS patient_medical_history (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    condition TEXT NOT NULL,
    diagnosis_date TEXT,
    status TEXT NOT NULL CHECK (status IN ('active', 'resolved', 'chronic')),
    notes TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_allergies_patient ON patient_allergies(patient_id);
CREATE INDEX IF NOT EXISTS idx_medications_patient ON patient_medications(patient_id);
CREATE INDEX IF NOT EXISTS idx_history_patient ON patient_medical_history(patient_id);

-- Charted visits (examination records)
CREATE TABLE IF NOT EXISTS medical_records (
    id TEXT PRIMARY KEY,
    clinic_id TEXT NOT NULL,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    record_date TEXT NOT NULL,
    chief_complaint TEXT NOT NULL,
    history_of_complaint TEXT,
    dental_history TEXT,
    medical_history TEXT,
    family_history TEXT,
    current_medications TEXT,
    allergies TEXT,
    extra_oral_examination TEXT,
    intra_oral_examination TEXT,
    diagnosis TEXT,
    treatment_plan TEXT,
    notes TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_patient ON medical_records(clinic_id, patient_id, record_date);

CREATE TABLE IF NOT EXISTS medical_record_attachments (
    id TEXT PRIMARY KEY,
    record_id TEXT NOT NULL REFERENCES medical_records(id) ON DELETE CASCADE,
    file_name TEXT NOT NULL,
    file_url TEXT NOT NULL,
    file_type TEXT,
    uploaded_by TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_record_attachments ON medical_record_attachments(record_id);

-- ============================================================================
-- Appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY,
    clinic_id TEXT NOT NULL,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    provider_id TEXT REFERENCES profiles(id),
    title TEXT NOT NULL,
    description TEXT,
    appointment_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'scheduled',
    scheduled_date TEXT NOT NULL,              -- YYYY-MM-DD
    start_time TEXT NOT NULL,                  -- HH:MM:SS
    end_time TEXT NOT NULL,
    notes TEXT,
    telemedicine_link TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (start_time < end_time)
);

CREATE INDEX IF NOT EXISTS idx_appointments_schedule ON appointments(clinic_id, scheduled_date, start_time);
CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);

-- ============================================================================
-- Billing
-- ============================================================================

-- Per-clinic invoice number counter, advanced inside the insert transaction
CREATE TABLE IF NOT EXISTS invoice_sequences (
    clinic_id TEXT PRIMARY KEY,
    next_value INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS invoices (
    id TEXT PRIMARY KEY,
    clinic_id TEXT NOT NULL,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    invoice_number TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    subtotal TEXT NOT NULL,
    tax_amount TEXT NOT NULL,
    discount_amount TEXT NOT NULL,
    total_amount TEXT NOT NULL,
    paid_amount TEXT NOT NULL,
    due_date TEXT,
    notes TEXT,
    version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (clinic_id, invoice_number)
);

CREATE INDEX IF NOT EXISTS idx_invoices_clinic ON invoices(clinic_id, status);

CREATE TABLE IF NOT EXISTS invoice_items (
    id TEXT PRIMARY KEY,
    invoice_id TEXT NOT NULL REFERENCES invoices(id),
    description TEXT NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    unit_price TEXT NOT NULL,
    total_price TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_invoice_items_invoice ON invoice_items(invoice_id);

CREATE TABLE IF NOT EXISTS payments (
    id TEXT PRIMARY KEY,
    clinic_id TEXT NOT NULL,
    invoice_id TEXT NOT NULL REFERENCES invoices(id),
    patient_id TEXT NOT NULL REFERENCES patients(id),
    amount TEXT NOT NULL,
    payment_method TEXT NOT NULL,
    payment_date TEXT NOT NULL,
    reference_number TEXT,
    proof_url TEXT,
    is_verified INTEGER NOT NULL DEFAULT 0,
    verified_by TEXT,
    verified_at TEXT,
    notes TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_payments_clinic ON payments(clinic_id, payment_date);
CREATE INDEX IF NOT EXISTS idx_payments_invoice ON payments(invoice_id);

-- ============================================================================
-- Inventory
-- ============================================================================

CREATE TABLE IF NOT EXISTS inventory_categories (
    id TEXT PRIMARY KEY,
    clinic_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (clinic_id, name)
);

CREATE TABLE IF NOT EXISTS inventory_items (
    id TEXT PRIMARY KEY,
    clinic_id TEXT NOT NULL,
    category_id TEXT REFERENCES inventory_categories(id),
    name TEXT NOT NULL,
    sku TEXT,
    description TEXT,
    unit TEXT NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity >= 0),
    min_quantity INTEGER NOT NULL CHECK (min_quantity >= 0),
    unit_cost TEXT NOT NULL,
    selling_price TEXT NOT NULL,
    expiry_date TEXT,
    supplier_name TEXT,
    supplier_contact TEXT,
    location TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_inventory_clinic ON inventory_items(clinic_id, is_active);

-- ============================================================================
-- Showcase (public page content)
-- ============================================================================

CREATE TABLE IF NOT EXISTS showcase_portfolio (
    id TEXT PRIMARY KEY,
    clinic_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    category TEXT NOT NULL,
    before_image_url TEXT,
    after_image_url TEXT,
    is_published INTEGER NOT NULL DEFAULT 0,
    display_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS showcase_testimonials (
    id TEXT PRIMARY KEY,
    clinic_id TEXT NOT NULL,
    patient_name TEXT NOT NULL,
    content TEXT NOT NULL,
    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    treatment_type TEXT,
    is_approved INTEGER NOT NULL DEFAULT 0,
    is_published INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS showcase_staff (
    id TEXT PRIMARY KEY,
    clinic_id TEXT NOT NULL,
    profile_id TEXT REFERENCES profiles(id),
    name TEXT NOT NULL,
    title TEXT NOT NULL,
    specialization TEXT,
    qualifications TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    bio TEXT,
    display_order INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = setup();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_appointment_time_check() {
        let conn = setup();
        conn.execute(
            "INSERT INTO patients (id, clinic_id, first_name, last_name, created_at, updated_at)
             VALUES ('p1', 'c1', 'A', 'B', 'now', 'now')",
            [],
        )
        .unwrap();

        let insert = |start: &str, end: &str| {
            conn.execute(
                "INSERT INTO appointments (id, clinic_id, patient_id, title, appointment_type,
                     scheduled_date, start_time, end_time, created_at, updated_at)
                 VALUES (?1, 'c1', 'p1', 'Visit', 'consultation', '2024-06-03', ?2, ?3, 'now', 'now')",
                [format!("{start}-{end}"), start.to_string(), end.to_string()],
            )
        };

        assert!(insert("09:30:00", "09:00:00").is_err());
        assert!(insert("09:00:00", "09:00:00").is_err());
        assert!(insert("09:00:00", "09:30:00").is_ok());
    }

    #[test]
    fn test_invoice_number_unique_per_clinic() {
        let conn = setup();
        conn.execute(
            "INSERT INTO patients (id, clinic_id, first_name, last_name, created_at, updated_at)
             VALUES ('p1', 'c1', 'A', 'B', 'now', 'now')",
            [],
        )
        .unwrap();

        let insert = |id: &str, clinic: &str| {
            conn.execute(
                "INSERT INTO invoices (id, clinic_id, patient_id, invoice_number, subtotal, tax_amount,
                     discount_amount, total_amount, paid_amount, created_at, updated_at)
                 VALUES (?1, ?2, 'p1', 'INV-000001', '0', '0', '0', '0', '0', 'now', 'now')",
                [id, clinic],
            )
        };

        assert!(insert("i1", "c1").is_ok());
        assert!(insert("i2", "c1").is_err());
        // Same number in another clinic is fine
        assert!(insert("i3", "c2").is_ok());
    }

    #[test]
    fn test_stock_cannot_go_negative_in_storage() {
        let conn = setup();
        let result = conn.execute(
            "INSERT INTO inventory_items (id, clinic_id, name, unit, quantity, min_quantity,
                 unit_cost, selling_price, created_at, updated_at)
             VALUES ('i1', 'c1', 'Gloves', 'box', -1, 0, '0', '0', 'now', 'now')",
            [],
        );
        assert!(result.is_err());
    }
}
