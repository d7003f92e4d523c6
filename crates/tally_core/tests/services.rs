use chrono::NaiveDate;
use std::fs;
use tally_core::{
    CsvRepository, ItemServiceError, ItemValidationError, Repository, Sequence, SequenceService,
    SequenceServiceError, StoreConfig, ITEM_SEQUENCE,
};
use tempfile::TempDir;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn config(dir: &TempDir) -> StoreConfig {
    StoreConfig {
        data_dir: dir.path().join("data"),
        ..StoreConfig::default()
    }
}

#[test]
fn sequence_starts_at_one_and_increments() {
    let dir = TempDir::new().unwrap();
    let repo: CsvRepository<Sequence> =
        CsvRepository::try_new(dir.path().join("sequence.csv")).unwrap();
    let service = SequenceService::new(repo.clone());

    assert_eq!(service.next("item").unwrap(), 1);
    assert_eq!(service.next("item").unwrap(), 2);
    assert_eq!(service.next("other").unwrap(), 1);
    assert_eq!(service.next("item").unwrap(), 3);

    assert_eq!(
        fs::read_to_string(repo.path()).unwrap(),
        "Name,Sequence\nitem,3\nother,1\n"
    );
    assert_eq!(service.current("item").unwrap(), 3);
}

#[test]
fn current_of_unknown_sequence_is_not_found() {
    let dir = TempDir::new().unwrap();
    let repo: CsvRepository<Sequence> =
        CsvRepository::try_new(dir.path().join("sequence.csv")).unwrap();
    let service = SequenceService::new(repo);

    let err = service.current("nope").unwrap_err();
    assert!(matches!(err, SequenceServiceError::SequenceNotFound(ref name) if name == "nope"));
}

#[test]
fn peek_next_reports_the_upcoming_value_without_advancing() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let sequences = config.open_sequence_service().unwrap();

    assert_eq!(sequences.peek_next(ITEM_SEQUENCE).unwrap(), 1);
    assert!(!config.sequences_path().exists());

    let items = config.open_item_service().unwrap();
    items.add_on("tea", 2.0, day()).unwrap();
    assert_eq!(sequences.peek_next(ITEM_SEQUENCE).unwrap(), 2);
    assert_eq!(sequences.peek_next(ITEM_SEQUENCE).unwrap(), 2);
    assert_eq!(items.add_on("cake", 3.0, day()).unwrap().id, "2");
}

#[test]
fn sequence_rejects_fractional_counters_on_read() {
    let dir = TempDir::new().unwrap();
    let repo: CsvRepository<Sequence> =
        CsvRepository::try_new(dir.path().join("sequence.csv")).unwrap();
    fs::write(repo.path(), "Name,Sequence\nitem,1.5\n").unwrap();

    assert!(repo.all().is_err());
    assert!(matches!(
        SequenceService::new(repo).next("item").unwrap_err(),
        SequenceServiceError::Repo(_)
    ));
}

#[test]
fn add_mints_sequential_ids_and_appends_rows() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let service = config.open_item_service().unwrap();

    let first = service.add_on("coffee", 5.0, day()).unwrap();
    let second = service.add_on("  tea  ", 9.0, day()).unwrap();

    assert_eq!(first.id, "1");
    assert_eq!(second.id, "2");
    assert_eq!(second.description, "tea");
    assert_eq!(
        fs::read_to_string(config.items_path()).unwrap(),
        "ID,Date,Description,Amount\n1,2024-01-01,coffee,5\n2,2024-01-01,tea,9\n"
    );
    assert_eq!(
        SequenceService::new(config.sequence_repository().unwrap())
            .current(ITEM_SEQUENCE)
            .unwrap(),
        2
    );
}

#[test]
fn rejected_input_does_not_consume_an_id() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let service = config.open_item_service().unwrap();

    let err = service.add_on("", 5.0, day()).unwrap_err();
    assert!(matches!(
        err,
        ItemServiceError::Validation(ItemValidationError::EmptyDescription)
    ));
    assert!(!config.sequences_path().exists());

    assert_eq!(service.add_on("ok", 1.0, day()).unwrap().id, "1");
}

#[test]
fn descriptions_with_line_breaks_are_rejected_before_writing() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let service = config.open_item_service().unwrap();

    for description in ["coffee\nbeans", "coffee\r\nbeans", "coffee\rbeans"] {
        let err = service.add_on(description, 5.0, day()).unwrap_err();
        assert!(matches!(
            err,
            ItemServiceError::Validation(ItemValidationError::DescriptionLineBreak)
        ));
    }
    assert!(!config.items_path().exists());

    service.add_on("coffee beans", 5.0, day()).unwrap();
    let listed = service.list().unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.items[0].description, "coffee beans");
}

#[test]
fn list_get_and_delete_round_trip() {
    let dir = TempDir::new().unwrap();
    let service = config(&dir).open_item_service().unwrap();

    assert_eq!(service.list().unwrap().total, 0);

    service.add_on("coffee", 5.0, day()).unwrap();
    service.add_on("tea", 9.0, day()).unwrap();

    let listed = service.list().unwrap();
    assert_eq!(listed.total, 2);
    assert_eq!(listed.items[1].description, "tea");

    assert_eq!(service.get("1").unwrap().unwrap().amount, 5.0);
    service.delete("1").unwrap();
    assert!(service.get("1").unwrap().is_none());

    let err = service.delete("1").unwrap_err();
    assert!(matches!(err, ItemServiceError::ItemNotFound(ref id) if id == "1"));
}

#[test]
fn delete_before_any_item_exists_is_not_found() {
    let dir = TempDir::new().unwrap();
    let service = config(&dir).open_item_service().unwrap();

    assert!(matches!(
        service.delete("1").unwrap_err(),
        ItemServiceError::ItemNotFound(_)
    ));
}
