/// Data layer: record types, input loading, and country names.
///
/// Architecture:
/// ```text
///  charts/*.csv  results.csv  jury.csv / public.csv  mapping.json
///        │            │               │                   │
///        ▼            ▼               ▼                   ▼
///   ┌──────────────────────────────────────┐       ┌──────────┐
///   │  loader  │  validate schema → records │       │ mapping  │  code → name
///   └──────────────────────────────────────┘       └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model   │  ChartRecord, ResultRecord, CrossTable, ScoreTable
///   └──────────┘
/// ```

pub mod loader;
pub mod mapping;
pub mod model;
