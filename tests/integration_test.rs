// ABOUTME: End-to-end scenarios exercising the VM's execute() surface

use pyrl::create_vm;

#[test]
fn recursive_factorial() {
    let mut vm = create_vm();
    let source = "def factorial($n):\n    if $n <= 1:\n        return 1\n    return $n * factorial($n - 1)\nprint(factorial(5))\n";
    let result = vm.execute(source);
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.stdout, "120\n");
}

#[test]
fn hash_round_trip() {
    let mut vm = create_vm();
    let source = "%u = {\"name\": \"Alice\", \"age\": 30}\n%u[\"email\"] = \"a@x\"\nprint(len(%u))\nprint(%u[\"email\"])\n";
    let result = vm.execute(source);
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.stdout, "3\na@x\n");
}

#[test]
fn anonymous_block_function_with_while_reverses_a_string() {
    let mut vm = create_vm();
    let source = "&reverse_string($s) = {\n    $r = \"\";\n    $i = len($s) - 1;\n    while $i >= 0 {\n        $r = $r + $s[$i];\n        $i = $i - 1\n    };\n    return $r\n}\nprint(&reverse_string(\"hello\"))\n";
    let result = vm.execute(source);
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.stdout, "olleh\n");
}

#[test]
fn class_with_init_and_method() {
    let mut vm = create_vm();
    let source = "class Counter { prop count = 0 ;\n  init() = { $count = 0 } ;\n  method inc() = { $count = $count + 1 } ;\n  method get() = { return $count } }\n$c = Counter()\n$c.inc(); $c.inc(); $c.inc()\nprint($c.get())\n";
    let result = vm.execute(source);
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.stdout, "3\n");
}

#[test]
fn builtin_not_shadowed_by_same_named_scalar() {
    let mut vm = create_vm();
    let source = "$len = 5\nprint(len(\"hi\"))\nprint($len)\n";
    let result = vm.execute(source);
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.stdout, "2\n5\n");
}

#[test]
fn regex_match() {
    let mut vm = create_vm();
    let source = "$t = \"hello world\"\nif $t =~ m/world/ :\n    print(\"yes\")\n";
    let result = vm.execute(source);
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.stdout, "yes\n");
}

#[test]
fn class_inheritance_walks_parent_chain_for_methods() {
    let mut vm = create_vm();
    let source = "class Animal { prop sound = \"...\" ;\n  method speak() = { print($sound) } }\nclass Dog extends Animal { prop sound = \"Woof\" }\n$d = Dog()\n$d.speak()\n";
    let result = vm.execute(source);
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.stdout, "Woof\n");
}

#[test]
fn list_reference_semantics_vs_scalar_copy() {
    let mut vm = create_vm();
    let source = "@a = [1, 2]\n@b = @a\nappend(@a, 3)\n$x = 1\n$y = $x\n$x = 99\nprint(len(@b))\nprint($y)\n";
    let result = vm.execute(source);
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.stdout, "3\n1\n");
}

#[test]
fn run_tests_surfaces_failures_with_labels() {
    let mut vm = create_vm();
    let source = "test \"addition works\" { assert 1 + 1 == 2 }\ntest \"broken\" { assert 1 + 1 == 3 }\n";
    let result = vm.execute(source);
    assert!(result.ok, "{:?}", result.error);
    let summary = vm.run_tests();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].label, "broken");
}

#[test]
fn undefined_variable_reports_normative_message() {
    let mut vm = create_vm();
    let result = vm.execute("print($ghost)\n");
    assert!(!result.ok);
    let err = result.error.unwrap();
    assert_eq!(err.kind, "NameError");
    assert_eq!(err.message, "Undefined variable: $ghost");
}
