use bookprovider_core::{
    Book, BookColumn, BookProvider, BookQuery, BookUri, BookValidationError, ChangeRecorder,
    ContentKind, ContentValues, FieldValue, ProviderConfig, ProviderError, Selection, UriError,
    DEFAULT_AUTHOR, DEFAULT_ISBN,
};
use std::sync::mpsc;
use std::sync::Arc;

const NOW: i64 = 1_700_000_000_000;

fn provider() -> BookProvider<Arc<ChangeRecorder>> {
    BookProvider::open(ProviderConfig::in_memory(), Arc::new(ChangeRecorder::new()))
        .unwrap()
        .with_clock(|| NOW)
}

fn collection(provider: &BookProvider<Arc<ChangeRecorder>>) -> String {
    provider.collection_uri().to_string()
}

fn insert_named(provider: &BookProvider<Arc<ChangeRecorder>>, name: &str) -> BookUri {
    provider
        .insert(
            &collection(provider),
            &ContentValues::new().with("name", name),
        )
        .unwrap()
}

fn all_books(provider: &BookProvider<Arc<ChangeRecorder>>) -> Vec<Book> {
    provider
        .query(&collection(provider), &BookQuery::new())
        .unwrap()
        .to_books()
        .unwrap()
}

#[test]
fn insert_then_query_returns_single_matching_record() {
    let provider = provider();

    let uri = insert_named(&provider, "Dune");
    assert_eq!(uri.kind(), ContentKind::Item);

    let books = provider
        .query(&uri.to_string(), &BookQuery::new())
        .unwrap()
        .to_books()
        .unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].id, uri.id().unwrap());
    assert_eq!(books[0].name.as_deref(), Some("Dune"));
}

#[test]
fn insert_applies_defaults_for_omitted_fields() {
    let provider = provider();
    insert_named(&provider, "Dune");

    let books = all_books(&provider);
    assert_eq!(books.len(), 1);
    let book = &books[0];
    assert_eq!(book.isbn.as_deref(), Some(DEFAULT_ISBN));
    assert_eq!(book.author.as_deref(), Some(DEFAULT_AUTHOR));
    assert_eq!(book.created_at, Some(NOW));
    assert_eq!(book.created_at, book.modified_at);
}

#[test]
fn insert_keeps_caller_supplied_fields() {
    let provider = provider();
    let values = ContentValues::new()
        .with("name", "Emma")
        .with("isbn", "978-0141439587")
        .with("author", "Jane Austen")
        .with("created_at", 10_i64)
        .with("modified_at", 20_i64);
    let uri = provider.insert(&collection(&provider), &values).unwrap();

    let book = provider
        .query(&uri.to_string(), &BookQuery::new())
        .unwrap()
        .to_books()
        .unwrap()
        .remove(0);
    assert_eq!(
        book,
        Book {
            id: uri.id().unwrap(),
            name: Some("Emma".to_string()),
            isbn: Some("978-0141439587".to_string()),
            author: Some("Jane Austen".to_string()),
            created_at: Some(10),
            modified_at: Some(20),
        }
    );
}

#[test]
fn insert_without_name_fails_and_stores_nothing() {
    let provider = provider();

    let err = provider
        .insert(&collection(&provider), &ContentValues::new())
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Validation(BookValidationError::MissingName)
    ));
    assert_eq!(err.to_string(), "book name required");

    let err = provider
        .insert(
            &collection(&provider),
            &ContentValues::new().with("author", "Anonymous"),
        )
        .unwrap_err();
    assert!(matches!(err, ProviderError::Validation(_)));

    assert!(all_books(&provider).is_empty());
    assert!(provider.notifier().changes().is_empty());
}

#[test]
fn insert_through_item_uri_is_rejected() {
    let provider = provider();
    let item = provider.collection_uri().with_appended_id(1).to_string();

    let err = provider
        .insert(&item, &ContentValues::new().with("name", "Dune"))
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::UnrecognizedIdentifier {
            reason: UriError::ItemNotAllowed(_),
            ..
        }
    ));
    assert!(all_books(&provider).is_empty());
}

#[test]
fn insert_with_unknown_column_is_rejected() {
    let provider = provider();
    let values = ContentValues::new().with("name", "Dune").with("price", 12_i64);

    let err = provider.insert(&collection(&provider), &values).unwrap_err();
    assert!(matches!(err, ProviderError::UnknownColumn(column) if column == "price"));
}

#[test]
fn insert_with_duplicate_id_fails_with_insert_error() {
    let provider = provider();
    let uri = insert_named(&provider, "Dune");
    let values = ContentValues::new()
        .with("name", "Copy")
        .with("id", uri.id().unwrap());

    let err = provider.insert(&collection(&provider), &values).unwrap_err();
    assert!(matches!(err, ProviderError::InsertFailed { .. }));
    assert_eq!(all_books(&provider).len(), 1);
}

#[test]
fn malformed_identifiers_are_unrecognized() {
    let provider = provider();
    for uri in [
        "content://bookprovider.books/books/abc",
        "content://bookprovider.books/books/1/extra",
        "content://bookprovider.books/authors",
        "content://elsewhere/books",
        "bookprovider.books/books",
    ] {
        let err = provider.query(uri, &BookQuery::new()).unwrap_err();
        assert!(
            matches!(err, ProviderError::UnrecognizedIdentifier { .. }),
            "{uri}: {err}"
        );
        assert!(provider.get_type(uri).is_err());
        assert!(provider.delete(uri, &Selection::all()).is_err());
    }
    assert!(provider.notifier().changes().is_empty());
}

#[test]
fn query_defaults_to_name_order_and_honors_sort_order() {
    let provider = provider();
    for name in ["Ulysses", "Dune", "Emma"] {
        insert_named(&provider, name);
    }

    let names = |query: &BookQuery| -> Vec<String> {
        provider
            .query(&collection(&provider), query)
            .unwrap()
            .iter()
            .filter_map(|row| row.get_str(BookColumn::Name).map(str::to_string))
            .collect()
    };

    assert_eq!(names(&BookQuery::new()), vec!["Dune", "Emma", "Ulysses"]);
    assert_eq!(
        names(&BookQuery::new().with_sort_order("name DESC")),
        vec!["Ulysses", "Emma", "Dune"]
    );
    assert_eq!(
        names(&BookQuery::new().with_sort_order("id")),
        vec!["Ulysses", "Dune", "Emma"]
    );
}

#[test]
fn query_projection_and_selection() {
    let provider = provider();
    insert_named(&provider, "Dune");
    provider
        .insert(
            &collection(&provider),
            &ContentValues::new()
                .with("name", "Emma")
                .with("author", "Jane Austen"),
        )
        .unwrap();

    let query = BookQuery::new()
        .with_projection(["name", "author"])
        .with_selection(Selection::new(
            "author = ?",
            vec![FieldValue::from("Jane Austen")],
        ));
    let cursor = provider.query(&collection(&provider), &query).unwrap();

    assert_eq!(cursor.columns(), &[BookColumn::Name, BookColumn::Author]);
    assert_eq!(cursor.len(), 1);
    let row = cursor.row(0).unwrap();
    assert_eq!(row.get_str(BookColumn::Name), Some("Emma"));
    assert_eq!(row.get(BookColumn::Id), None);
    assert_eq!(cursor.notification_uri(), &provider.collection_uri());
}

#[test]
fn query_rejects_unknown_projection_and_sort_columns() {
    let provider = provider();

    let err = provider
        .query(
            &collection(&provider),
            &BookQuery::new().with_projection(["name", "password"]),
        )
        .unwrap_err();
    assert!(matches!(err, ProviderError::UnknownColumn(column) if column == "password"));

    let err = provider
        .query(
            &collection(&provider),
            &BookQuery::new().with_sort_order("name; DROP TABLE books"),
        )
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidSortOrder(_)));
}

#[test]
fn malformed_selection_is_a_store_error() {
    let provider = provider();
    insert_named(&provider, "Dune");

    let err = provider
        .query(
            &collection(&provider),
            &BookQuery::new().with_selection(Selection::new("name ==== ?", vec![])),
        )
        .unwrap_err();
    assert!(matches!(err, ProviderError::Store(_)));
}

#[test]
fn item_update_only_touches_that_row() {
    let provider = provider();
    let dune = insert_named(&provider, "Dune");
    let emma = insert_named(&provider, "Emma");

    let count = provider
        .update(
            &dune.to_string(),
            &ContentValues::new().with("author", "Frank Herbert"),
            &Selection::new("1 = 1", vec![]),
        )
        .unwrap();
    assert_eq!(count, 1);

    let books = all_books(&provider);
    let by_id = |id| books.iter().find(|book| book.id == id).unwrap();
    assert_eq!(by_id(dune.id().unwrap()).author.as_deref(), Some("Frank Herbert"));
    assert_eq!(by_id(emma.id().unwrap()).author.as_deref(), Some(DEFAULT_AUTHOR));
}

#[test]
fn item_update_conjoins_caller_filter() {
    let provider = provider();
    let dune = insert_named(&provider, "Dune");

    let count = provider
        .update(
            &dune.to_string(),
            &ContentValues::new().with("name", "X"),
            &Selection::new("name = ?", vec![FieldValue::from("Emma")]),
        )
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(all_books(&provider)[0].name.as_deref(), Some("Dune"));
}

#[test]
fn collection_update_applies_filter_and_leaves_modified_at() {
    let provider = provider();
    insert_named(&provider, "Dune");
    insert_named(&provider, "Emma");

    let count = provider
        .update(
            &collection(&provider),
            &ContentValues::new().with("isbn", "pending"),
            &Selection::all(),
        )
        .unwrap();
    assert_eq!(count, 2);

    for book in all_books(&provider) {
        assert_eq!(book.isbn.as_deref(), Some("pending"));
        assert_eq!(book.modified_at, Some(NOW));
    }
}

#[test]
fn update_missing_item_returns_zero_and_still_notifies() {
    let provider = provider();
    let missing = provider.collection_uri().with_appended_id(5);

    let count = provider
        .update(
            &missing.to_string(),
            &ContentValues::new().with("name", "X"),
            &Selection::all(),
        )
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(provider.notifier().take(), vec![missing]);
}

#[test]
fn update_rejects_empty_values_and_unknown_columns() {
    let provider = provider();
    let uri = collection(&provider);

    let err = provider
        .update(&uri, &ContentValues::new(), &Selection::all())
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Validation(BookValidationError::EmptyValues)
    ));

    let err = provider
        .update(&uri, &ContentValues::new().with("rating", 5_i64), &Selection::all())
        .unwrap_err();
    assert!(matches!(err, ProviderError::UnknownColumn(_)));
    assert!(provider.notifier().changes().is_empty());
}

#[test]
fn delete_item_and_collection() {
    let provider = provider();
    let dune = insert_named(&provider, "Dune");
    insert_named(&provider, "Emma");
    insert_named(&provider, "Ulysses");

    let removed = provider
        .delete(&dune.to_string(), &Selection::new("1 = 1", vec![]))
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(all_books(&provider).len(), 2);

    let removed = provider
        .delete(
            &collection(&provider),
            &Selection::new("name = ?", vec![FieldValue::from("Emma")]),
        )
        .unwrap();
    assert_eq!(removed, 1);

    let removed = provider
        .delete(&collection(&provider), &Selection::all())
        .unwrap();
    assert_eq!(removed, 1);
    assert!(all_books(&provider).is_empty());
}

#[test]
fn delete_missing_item_is_not_an_error() {
    let provider = provider();
    let missing = provider.collection_uri().with_appended_id(99);

    assert_eq!(provider.delete(&missing.to_string(), &Selection::all()).unwrap(), 0);
    assert_eq!(provider.delete(&missing.to_string(), &Selection::all()).unwrap(), 0);
    assert_eq!(provider.notifier().take(), vec![missing.clone(), missing]);
}

#[test]
fn item_operations_reject_filters_that_escape_the_id_scope() {
    let provider = provider();
    let dune = insert_named(&provider, "Dune");
    insert_named(&provider, "Emma");
    insert_named(&provider, "Ulysses");
    provider.notifier().take();
    let item = dune.to_string();

    for clause in ["0) OR (1", "1 = 1; DELETE FROM books", "name = ? -- ", "1 = 1) OR (1 = 1"] {
        let selection = Selection::new(clause, vec![]);

        let err = provider.delete(&item, &selection).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSelection(_)), "{clause}");

        let err = provider
            .update(&item, &ContentValues::new().with("name", "X"), &selection)
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSelection(_)), "{clause}");

        let err = provider
            .query(&item, &BookQuery::new().with_selection(selection))
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSelection(_)), "{clause}");
    }

    let names: Vec<_> = all_books(&provider)
        .into_iter()
        .filter_map(|book| book.name)
        .collect();
    assert_eq!(names, vec!["Dune", "Emma", "Ulysses"]);
    assert!(provider.notifier().changes().is_empty());
}

#[test]
fn item_operations_keep_grouped_filters_inside_the_id_scope() {
    let provider = provider();
    let dune = insert_named(&provider, "Dune");
    insert_named(&provider, "Emma");

    let removed = provider
        .delete(
            &dune.to_string(),
            &Selection::new("(0) OR (1) OR name = ')'", vec![]),
        )
        .unwrap();
    assert_eq!(removed, 1);

    let books = all_books(&provider);
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].name.as_deref(), Some("Emma"));
}

#[test]
fn insert_rejects_ids_an_item_identifier_cannot_address() {
    let provider = provider();

    for id in [FieldValue::Integer(0), FieldValue::Integer(-5), FieldValue::from("7")] {
        let values = ContentValues::new().with("name", "Dune").with("id", id);
        let err = provider.insert(&collection(&provider), &values).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Validation(BookValidationError::InvalidId(_))
        ));
    }
    assert!(all_books(&provider).is_empty());
    assert!(provider.notifier().changes().is_empty());

    let values = ContentValues::new().with("name", "Dune").with("id", 42_i64);
    let uri = provider.insert(&collection(&provider), &values).unwrap();
    assert_eq!(uri.id(), Some(42));
    assert_eq!(
        provider.resolve_content_kind(&uri.to_string()).unwrap(),
        ContentKind::Item
    );
    assert_eq!(provider.query(&uri.to_string(), &BookQuery::new()).unwrap().len(), 1);
}

#[test]
fn mutations_notify_the_addressed_identifier() {
    let provider = provider();
    let collection_uri = provider.collection_uri();

    let dune = insert_named(&provider, "Dune");
    provider
        .update(
            &dune.to_string(),
            &ContentValues::new().with("isbn", "x"),
            &Selection::all(),
        )
        .unwrap();
    provider
        .delete(&collection_uri.to_string(), &Selection::all())
        .unwrap();
    provider
        .query(&collection_uri.to_string(), &BookQuery::new())
        .unwrap();

    assert_eq!(
        provider.notifier().take(),
        vec![dune.clone(), dune, collection_uri]
    );
}

#[test]
fn channel_notifier_receives_changes() {
    let (tx, rx) = mpsc::channel();
    let provider = BookProvider::open(ProviderConfig::in_memory(), tx).unwrap();
    let collection_uri = provider.collection_uri();

    let inserted = provider
        .insert(
            &collection_uri.to_string(),
            &ContentValues::new().with("name", "Dune"),
        )
        .unwrap();

    assert_eq!(rx.try_recv().unwrap(), inserted);
    assert!(rx.try_recv().is_err());
}

#[test]
fn get_type_distinguishes_collection_and_item() {
    let provider = BookProvider::open(
        ProviderConfig::in_memory().with_authority("com.example.library"),
        ChangeRecorder::new(),
    )
    .unwrap();

    assert_eq!(
        provider
            .resolve_content_kind("content://com.example.library/books")
            .unwrap(),
        ContentKind::Collection
    );
    assert_eq!(
        provider
            .get_type("content://com.example.library/books/12")
            .unwrap(),
        provider.config().item_content_type
    );
    assert!(provider
        .get_type("content://bookprovider.books/books")
        .is_err());
}
