use cvm_typeid::typeid::{
    ClassTypeId, Error, ExecEnv, RomImage, TypeIdConfig, TypeIdStats, TypeIds,
};
use std::thread;

const EE: ExecEnv = ExecEnv(0);

fn type_ids() -> TypeIds {
    TypeIds::new(TypeIdConfig::default()).unwrap()
}

#[test]
fn interning_twice_shares_the_token() {
    let ids = type_ids();
    let first = ids.new_class_id(EE, b"java/lang/Object").unwrap();
    assert_eq!(ids.class_ref_count(first), Some(1));
    let second = ids.new_class_id(EE, b"java/lang/Object").unwrap();
    assert_eq!(first, second);
    assert_eq!(ids.class_ref_count(first), Some(2));
    assert_eq!(ids.lookup_class_id(b"java/lang/Object"), Some(first));

    ids.dispose_class_id(second);
    ids.dispose_class_id(first);
    assert_eq!(ids.lookup_class_id(b"java/lang/Object"), None);
}

#[test]
fn array_depth_stays_in_range() {
    let ids = type_ids();
    let int = ids.new_class_id(EE, b"I").unwrap();
    assert_eq!(int, ClassTypeId::INT);

    let int3 = ids.increment_array_depth(int, 3).unwrap();
    assert_eq!(ids.class_name_to_string(int3), "[[[I");
    assert!(matches!(
        ids.increment_array_depth(int, -1),
        Err(Error::CapacityExceeded(_))
    ));
    assert!(matches!(
        ids.increment_array_depth(int3, -4),
        Err(Error::CapacityExceeded(_))
    ));
    assert_eq!(ids.increment_array_depth(int3, -3).unwrap(), int);
}

#[test]
fn members_compare_by_both_halves() {
    let ids = type_ids();
    let count_int = ids.new_field_id(EE, b"count", b"I").unwrap();
    let count_long = ids.new_field_id(EE, b"count", b"J").unwrap();
    let size_int = ids.new_field_id(EE, b"size", b"I").unwrap();

    assert!(count_int.is_same_member_name(&count_long));
    assert!(!count_int.is_same_member(&count_long));
    assert!(count_int.is_same_member_type(&size_int));
    assert!(!count_int.is_same_member_name(&size_int));
    assert_eq!(ids.new_field_id(EE, b"count", b"I").unwrap(), count_int);
    assert!(ids.field_is_doubleword(count_long));
    assert!(!ids.field_is_ref(size_int));

    let run = ids.new_method_id(EE, b"run", b"(Ljava/lang/String;J)V").unwrap();
    assert_eq!(ids.method_args_size(run.ty()), 3);
    assert_eq!(ids.member_name_to_string(run.name()), "run");
    assert_eq!(ids.method_sig_to_string(run.ty()), "(Ljava/lang/String;J)V");
    let string = ids.lookup_class_id(b"java/lang/String").unwrap();
    assert_eq!(ids.class_ref_count(string), Some(1));
}

#[test]
fn disposing_everything_empties_the_tables() {
    let ids = type_ids();
    let empty = ids.stats();

    let field = ids.new_field_id(EE, b"next", b"Lq/Node;").unwrap();
    let method = ids
        .new_method_id(EE, b"link", b"(Lq/Node;[Lq/Edge;IIIIIIII)Lq/Node;")
        .unwrap();
    let array = ids.new_class_id(EE, b"[[Lq/Node;").unwrap();
    let grown = ids.stats();
    assert_ne!(grown, empty);
    assert_eq!(grown.packages, empty.packages + 1);

    ids.dispose_class_id(array);
    ids.dispose_method_id(method);
    ids.dispose_field_id(field);
    assert_eq!(ids.stats(), empty);
    ids.check_tables().unwrap();

    // Freed entries are recycled
    let again = ids.new_class_id(EE, b"r/Other").unwrap();
    assert_eq!(
        ids.stats(),
        TypeIdStats {
            classes: empty.classes + 1,
            packages: empty.packages + 1,
            ..empty
        }
    );
    ids.dispose_class_id(again);
    assert_eq!(ids.stats(), empty);
}

#[test]
fn reference_counts_saturate() {
    let ids = type_ids();
    let mut id = ClassTypeId::ERROR;
    for _ in 0..300 {
        id = ids.new_class_id(EE, b"s/Popular").unwrap();
    }
    assert_eq!(ids.class_ref_count(id), Some(u8::MAX));
    for _ in 0..300 {
        ids.dispose_class_id(id);
    }
    assert_eq!(ids.lookup_class_id(b"s/Popular"), Some(id));
    assert_eq!(ids.class_ref_count(id), Some(u8::MAX));
}

#[test]
fn concurrent_interning_agrees() {
    let ids = type_ids();
    let tokens: Vec<Vec<ClassTypeId>> = thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let ids = &ids;
                scope.spawn(move || {
                    (0..10)
                        .map(|_| {
                            ids.new_class_id(ExecEnv(worker), b"c/Shared").unwrap();
                            ids.new_method_id(ExecEnv(worker), b"go", b"(JD)V").unwrap();
                            ids.new_class_id(ExecEnv(worker), b"[Lc/Shared;").unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().unwrap())
            .collect()
    });

    let first = tokens[0][0];
    assert!(tokens.iter().flatten().all(|token| *token == first));
    let shared = ids.lookup_class_id(b"c/Shared").unwrap();
    assert_eq!(first.base_type(), shared);
    assert_eq!(ids.class_ref_count(shared), Some(160));
    ids.check_tables().unwrap();
}

#[test]
fn rom_entries_outlive_their_users() {
    let rom = RomImage::new()
        .class("java/lang/Object")
        .method("<init>", "()V")
        .field("value", "[C");
    let ids = TypeIds::with_rom(TypeIdConfig::default(), &rom).unwrap();
    let baseline = ids.stats();

    let object = ids.lookup_class_id(b"java/lang/Object").unwrap();
    assert_eq!(ids.class_ref_count(object), Some(u8::MAX));

    let again = ids.new_class_id(EE, b"java/lang/Object").unwrap();
    let init = ids.new_method_id(EE, b"<init>", b"()V").unwrap();
    ids.dispose_class_id(again);
    ids.dispose_method_id(init);
    ids.dispose_method_id(init);
    assert_eq!(ids.lookup_class_id(b"java/lang/Object"), Some(object));
    assert!(ids.lookup_field_id(b"value", b"[C").is_some());
    assert_eq!(ids.stats(), baseline);
}
